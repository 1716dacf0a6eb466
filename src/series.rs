//! # Time Series Manifests
//!
//! A ParaView collection file (`.pvd`) lists the frame files of an animation next to the
//! simulation time of each:
//!
//! ```xml
//! <?xml version="1.0"?>
//! <VTKFile type="Collection" version="0.1" byte_order="LittleEndian">
//!   <Collection>
//!     <DataSet timestep="0.01" group="" part="0" file="fluid_data_t0000.vti"/>
//!     <DataSet timestep="0.02" group="" part="0" file="fluid_data_t0001.vti"/>
//!   </Collection>
//! </VTKFile>
//! ```
//!
//! Entries are written in the order they were produced. The times are recorded exactly as
//! the simulation declared them: they are never sorted, deduplicated, or checked for
//! monotonicity.

use crate::prelude::*;

use derive_more::From;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use std::io::BufRead;
use std::path::{Component, Path};

/// One frame file of an animation
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesEntry {
    pub time: f64,
    /// position of the frame in the animation
    pub frame_index: usize,
    /// path of the frame file, relative to the manifest's directory
    pub file: String,
}

/// An ordered list of frame files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesIndex {
    entries: Vec<TimeSeriesEntry>,
}

impl TimeSeriesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair up times and files that were produced together.
    pub fn from_parts<T: AsRef<str>>(times: &[f64], files: &[T]) -> Result<Self, IndexError> {
        if times.len() != files.len() {
            return Err(IndexError::TimestepFilenameCountMismatch {
                times: times.len(),
                files: files.len(),
            });
        }

        let mut index = Self::new();
        for (time, file) in times.iter().zip(files) {
            index.push(*time, file.as_ref());
        }

        Ok(index)
    }

    /// Append the next frame file
    pub fn push<T: Into<String>>(&mut self, time: f64, file: T) {
        let frame_index = self.entries.len();
        self.entries.push(TimeSeriesEntry {
            time,
            frame_index,
            file: file.into(),
        });
    }

    pub fn entries(&self) -> &[TimeSeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the index as a `.pvd` collection
    pub fn write_pvd<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut xml = Writer::new_with_indent(writer, b' ', 2);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;

        let root = BytesStart::new("VTKFile").with_attributes([
            ("type", "Collection"),
            ("version", "0.1"),
            ("byte_order", "LittleEndian"),
        ]);
        xml.write_event(Event::Start(root))?;
        xml.write_event(Event::Start(BytesStart::new("Collection")))?;

        let mut buffer = ryu::Buffer::new();

        for entry in &self.entries {
            let dataset = BytesStart::new("DataSet").with_attributes([
                ("timestep", buffer.format(entry.time)),
                ("group", ""),
                ("part", "0"),
                ("file", entry.file.as_str()),
            ]);
            xml.write_event(Event::Empty(dataset))?;
        }

        xml.write_event(Event::End(BytesEnd::new("Collection")))?;
        xml.write_event(Event::End(BytesEnd::new("VTKFile")))?;

        let mut inner = xml.into_inner();
        inner.write_all(b"\n")?;
        inner.flush()?;

        Ok(())
    }

    /// Create `path` and write the index to it
    pub fn write_pvd_file(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::File::create(path)?;
        self.write_pvd(std::io::BufWriter::new(file))
    }
}

/// Read a `.pvd` collection back into an index. Entries keep their file order.
pub fn read_pvd(path: &Path) -> Result<TimeSeriesIndex, Error> {
    let file = std::fs::File::open(path)?;
    let index = parse_pvd(std::io::BufReader::new(file))?;
    Ok(index)
}

/// Parse the `DataSet` elements of a `.pvd` collection
pub fn parse_pvd<R: BufRead>(reader: R) -> Result<TimeSeriesIndex, ManifestError> {
    let mut reader = Reader::from_reader(reader);
    reader.trim_text(true);

    let mut buffer = Vec::new();
    let mut index = TimeSeriesIndex::new();

    loop {
        match reader.read_event_into(&mut buffer).map_err(MalformedXml::from)? {
            Event::Start(element) | Event::Empty(element)
                if element.name().as_ref() == b"DataSet" =>
            {
                let time = required_attribute(&element, "timestep")?;
                let time = time
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| InvalidTime::new(time.clone()))?;
                let file = required_attribute(&element, "file")?;

                index.push(time, file);
            }
            Event::Eof => break,
            _ => (),
        }

        buffer.clear();
    }

    Ok(index)
}

fn required_attribute(element: &BytesStart, name: &'static str) -> Result<String, ManifestError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(MalformedAttribute::from)?;

        if attribute.key.as_ref() == name.as_bytes() {
            let value = attribute
                .unescape_value()
                .map_err(MalformedXml::from)?
                .into_owned();
            return Ok(value);
        }
    }

    Err(MissingAttribute::new("DataSet", name).into())
}

/// `target` relative to the directory `base`, with `/` separators as a manifest stores it.
///
/// Both paths are compared component by component, so they should both be absolute or
/// both be relative to the same directory.
pub fn relative_to(base: &Path, target: &Path) -> String {
    let base: Vec<Component> = base.components().filter(|c| *c != Component::CurDir).collect();
    let target: Vec<Component> = target
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(base.len() - common)
        .collect();

    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    parts.join("/")
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("{times} timesteps were given for {files} frame files")]
    TimestepFilenameCountMismatch { times: usize, files: usize },
}

/// Failure to read a `.pvd` collection
#[derive(Debug, thiserror::Error, From)]
pub enum ManifestError {
    #[error("{0}")]
    MalformedXml(MalformedXml),
    #[error("{0}")]
    MalformedAttribute(MalformedAttribute),
    #[error("{0}")]
    MissingAttribute(MissingAttribute),
    #[error("{0}")]
    InvalidTime(InvalidTime),
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml element: {xml_err}")]
pub struct MalformedXml {
    xml_err: quick_xml::Error,
}

#[derive(From, Display, Debug)]
#[display(fmt = "failed to parse an xml attribute: {att_err}")]
pub struct MalformedAttribute {
    att_err: AttrError,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "`{element_name}` element is missing the `{attribute_name}` attribute")]
pub struct MissingAttribute {
    pub(crate) element_name: &'static str,
    pub(crate) attribute_name: &'static str,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "timestep `{value}` is not a number")]
pub struct InvalidTime {
    pub(crate) value: String,
}
