use std::{
    fs,
    io::{self, BufRead},
    path::Path,
};

use log::{debug, info};
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::{
    error::{Error, ReadError, Result},
    record::{Attributes, Field, FlowRecord, Label, TAG},
};

/// Flow records of one run, with labels aligned by index when requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub records: Vec<FlowRecord>,
    pub labels: Vec<Label>,
}

impl Dataset {
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records per label, in `Label::ALL` order.
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0; 2];
        for label in &self.labels {
            counts[*label as usize] += 1;
        }
        counts
    }
}

/// Reads `files` (relative to `dir`) in order and concatenates their flows.
/// With `labeled` set, every flow must carry a `Tag` element.
pub fn load_dataset<S: AsRef<Path>>(dir: &Path, files: &[S], labeled: bool) -> Result<Dataset> {
    let mut dataset = Dataset::default();

    for file in files {
        let path = dir.join(file);
        info!("reading flows from {}", path.display());
        let records = read_flow_file(&path)?;

        if labeled {
            for (i, record) in records.iter().enumerate() {
                let label = record.label().ok_or_else(|| {
                    Error::read(
                        &path,
                        ReadError::MissingField {
                            flow: i + 1,
                            field: TAG,
                        },
                    )
                })?;
                dataset.labels.push(label);
            }
        }

        info!("loaded {} flows from {}", records.len(), path.display());
        dataset.records.extend(records);
    }

    Ok(dataset)
}

pub fn read_flow_file(path: &Path) -> Result<Vec<FlowRecord>> {
    let file = fs::File::open(path).map_err(|e| Error::read(path, e))?;
    parse_flows(io::BufReader::new(file)).map_err(|e| Error::read(path, e))
}

/// Parses a flow summary document: a root element whose children are flows
/// and whose grandchildren are the flows' fields. Anything nested deeper is
/// ignored.
pub fn parse_flows<R: BufRead>(reader: R) -> std::result::Result<Vec<FlowRecord>, ReadError> {
    let mut reader = Reader::from_reader(reader);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut records = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut root_closed = false;
    let mut flow: Option<FlowRecord> = None;
    let mut field: Option<(String, Field)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                match open.len() {
                    0 if root_closed => return Err(trailing(&start)),
                    1 => flow = Some(new_flow(&start)?),
                    2 => field = Some(new_field(&start)?),
                    _ => {}
                }
                open.push(element_name(&start));
            }
            Event::Empty(start) => match open.len() {
                0 if root_closed => return Err(trailing(&start)),
                0 => root_closed = true,
                1 => records.push(new_flow(&start)?),
                2 => {
                    let (name, value) = new_field(&start)?;
                    if let Some(flow) = flow.as_mut() {
                        flow.insert(name, value);
                    }
                }
                _ => {}
            },
            Event::Text(text) if open.len() == 3 => {
                if let Some((_, value)) = field.as_mut() {
                    value.value.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) if open.len() == 3 => {
                if let Some((_, value)) = field.as_mut() {
                    value.value.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                open.pop();
                match open.len() {
                    2 => {
                        if let (Some(flow), Some((name, value))) = (flow.as_mut(), field.take()) {
                            flow.insert(name, value);
                        }
                    }
                    1 => {
                        if let Some(flow) = flow.take() {
                            debug!("parsed flow #{} with {} fields", records.len() + 1, flow.len());
                            records.push(flow);
                        }
                    }
                    0 => root_closed = true,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    // quick-xml reports Eof with elements still open.
    if let Some(name) = open.pop() {
        return Err(ReadError::UnclosedElement(name));
    }
    if !root_closed {
        return Err(ReadError::NoRootElement);
    }

    Ok(records)
}

fn new_flow(start: &BytesStart) -> std::result::Result<FlowRecord, ReadError> {
    let mut flow = FlowRecord::new(element_name(start));
    flow.attributes = attributes(start)?;
    Ok(flow)
}

fn new_field(start: &BytesStart) -> std::result::Result<(String, Field), ReadError> {
    let field = Field {
        value: String::new(),
        attributes: attributes(start)?,
    };
    Ok((element_name(start), field))
}

fn trailing(start: &BytesStart) -> ReadError {
    ReadError::TrailingElement(element_name(start))
}

#[inline]
fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn attributes(start: &BytesStart) -> std::result::Result<Attributes, ReadError> {
    start
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            Ok((key, value))
        })
        .collect()
}
