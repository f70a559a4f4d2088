use ahash::RandomState;
use indexmap::IndexMap;

pub const SOURCE: &str = "source";
pub const DESTINATION: &str = "destination";
pub const SOURCE_PORT: &str = "sourcePort";
pub const DESTINATION_PORT: &str = "destinationPort";
pub const PROTOCOL_NAME: &str = "protocolName";
pub const START_DATE_TIME: &str = "startDateTime";
pub const STOP_DATE_TIME: &str = "stopDateTime";
pub const TAG: &str = "Tag";

pub const TAG_NORMAL: &str = "Normal";

pub type FieldMap = IndexMap<String, Field, RandomState>;

/// Attribute list of an element, in document order.
pub type Attributes = Vec<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub value: String,
    pub attributes: Attributes,
}

/// One `<flow>` element of a flow summary document.
///
/// Fields keep the position of their first occurrence; a repeated field name
/// replaces the earlier value in place.
#[derive(Debug, Clone)]
pub struct FlowRecord {
    pub element: String,
    pub attributes: Attributes,
    fields: FieldMap,
}

impl FlowRecord {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            attributes: Attributes::new(),
            fields: FieldMap::with_hasher(RandomState::new()),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        self.fields.insert(name.into(), field);
    }

    /// Builder-style shorthand used when assembling records by hand.
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.insert(
            name,
            Field {
                value: value.to_owned(),
                attributes: Attributes::new(),
            },
        );
        self
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|field| field.value.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn label(&self) -> Option<Label> {
        self.get(TAG).map(Label::from_tag)
    }
}

/// Ordered equality: two records are equal only if their fields appear in the
/// same order.
impl PartialEq for FlowRecord {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
            && self.attributes == other.attributes
            && self.fields.len() == other.fields.len()
            && self.fields.iter().eq(other.fields.iter())
    }
}

impl Eq for FlowRecord {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Normal = 0,
    Attack = 1,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Normal, Label::Attack];

    pub fn from_tag(tag: &str) -> Self {
        if tag == TAG_NORMAL {
            Label::Normal
        } else {
            Label::Attack
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_field_keeps_first_position() {
        let record = FlowRecord::new("flow")
            .with_field(SOURCE, "10.0.0.1")
            .with_field(TAG, "Attack")
            .with_field(SOURCE, "10.0.0.9");

        let names: Vec<_> = record.fields().map(|(name, _)| name).collect();
        assert_eq!(names, [SOURCE, TAG]);
        assert_eq!(record.get(SOURCE), Some("10.0.0.9"));
    }

    #[test]
    fn anything_but_normal_is_an_attack() {
        assert_eq!(Label::from_tag("Normal"), Label::Normal);
        assert_eq!(Label::from_tag("Attack"), Label::Attack);
        assert_eq!(Label::from_tag("normal"), Label::Attack);
        assert_eq!(FlowRecord::new("flow").label(), None);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let a = FlowRecord::new("flow")
            .with_field(SOURCE, "a")
            .with_field(DESTINATION, "b");
        let b = FlowRecord::new("flow")
            .with_field(DESTINATION, "b")
            .with_field(SOURCE, "a");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
