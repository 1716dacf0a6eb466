use super::data::VtkData;
use crate::config::EncodingKind;
use crate::traits::{Array, DataArray, Domain, Encode};
use crate::Error;

use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

/// size of the byte count that precedes every binary block (`header_type="UInt64"`)
const HEADER_BYTES: usize = std::mem::size_of::<u64>();

/// Write a given vtk file to a `Writer`
pub fn write_vtk<W, DOMAIN, D, E>(writer: W, data: &VtkData<DOMAIN, D>) -> Result<(), Error>
where
    W: Write,
    DOMAIN: Domain,
    D: DataArray,
    E: Encode,
{
    let mut writer = ArrayWriter::<W, E>::new(writer);

    writer
        .xml
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let dataset = data.domain.dataset_type();

    writer.start_element(
        "VTKFile",
        &[
            ("type", dataset.to_string()),
            ("version", "1.0".to_string()),
            ("byte_order", "LittleEndian".to_string()),
            ("header_type", "UInt64".to_string()),
        ],
    )?;

    writer.start_element(dataset, &data.domain.dataset_attributes())?;
    writer.start_element("Piece", &data.domain.piece_attributes())?;

    // geometry arrays (points, connectivity) come before any point data
    data.domain.write_geometry(&mut writer)?;

    writer.start_element("PointData", &data.data.active_attributes())?;
    data.data.write_point_data(&mut writer)?;
    writer.end_element("PointData")?;

    writer.end_element("Piece")?;
    writer.end_element(dataset)?;

    let mut inner = writer.finish()?;
    inner.flush()?;

    Ok(())
}

/// Write a vtk file with an encoding chosen at runtime
pub fn write_vtk_encoded<W, DOMAIN, D>(
    encoding: EncodingKind,
    writer: W,
    data: &VtkData<DOMAIN, D>,
) -> Result<(), Error>
where
    W: Write,
    DOMAIN: Domain,
    D: DataArray,
{
    match encoding {
        EncodingKind::Binary => write_vtk::<_, _, _, crate::Binary>(writer, data),
        EncodingKind::Base64 => write_vtk::<_, _, _, crate::Base64>(writer, data),
        EncodingKind::Ascii => write_vtk::<_, _, _, crate::Ascii>(writer, data),
    }
}

/// Create `path` and write a vtk file to it
pub fn write_vtk_file<DOMAIN, D>(
    path: &Path,
    encoding: EncodingKind,
    data: &VtkData<DOMAIN, D>,
) -> Result<(), Error>
where
    DOMAIN: Domain,
    D: DataArray,
{
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    write_vtk_encoded(encoding, writer, data)
}

/// Streams the xml elements of a vtk file and encodes each `DataArray`
/// according to `E`.
///
/// With the appended encoding, arrays only write their header element in place and
/// their bytes are queued; the queue is written as the `<AppendedData>` section once the
/// dataset element is closed.
pub struct ArrayWriter<W: Write, E> {
    xml: Writer<W>,
    appended: Vec<u8>,
    _encoding: PhantomData<E>,
}

impl<W: Write, E: Encode> ArrayWriter<W, E> {
    pub(crate) fn new(inner: W) -> Self {
        Self {
            xml: Writer::new_with_indent(inner, b' ', 2),
            appended: Vec::new(),
            _encoding: PhantomData,
        }
    }

    /// open an element with the given attributes
    pub fn start_element(&mut self, name: &str, attributes: &[(&str, String)]) -> Result<(), Error> {
        let element = BytesStart::new(name)
            .with_attributes(attributes.iter().map(|(key, value)| (*key, value.as_str())));
        self.xml.write_event(Event::Start(element))?;
        Ok(())
    }

    /// close an element opened with `start_element`
    pub fn end_element(&mut self, name: &str) -> Result<(), Error> {
        self.xml.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// write a single array of data (such as the density field)
    /// to the vtk file.
    pub fn write_array<A: Array + ?Sized>(&mut self, name: &str, array: &A) -> Result<(), Error> {
        let components = array.components().to_string();
        let mut attributes = vec![
            ("type", array.precision().as_str()),
            ("Name", name),
            ("NumberOfComponents", components.as_str()),
            ("format", E::FORMAT.attribute()),
        ];

        match E::FORMAT {
            Format::Ascii => {
                let mut text = String::with_capacity(array.length() * array.components() * 8);
                array.push_ascii(&mut text);

                let element = BytesStart::new("DataArray").with_attributes(attributes);
                self.xml.write_event(Event::Start(element))?;
                self.xml.write_event(Event::Text(BytesText::new(&text)))?;
                self.xml.write_event(Event::End(BytesEnd::new("DataArray")))?;
            }
            Format::Base64 => {
                let mut bytes = Vec::with_capacity(HEADER_BYTES + array.byte_len());
                push_block(&mut bytes, array);
                let text = base64::encode(bytes.as_slice());

                let element = BytesStart::new("DataArray").with_attributes(attributes);
                self.xml.write_event(Event::Start(element))?;
                self.xml.write_event(Event::Text(BytesText::new(&text)))?;
                self.xml.write_event(Event::End(BytesEnd::new("DataArray")))?;
            }
            Format::Appended => {
                // offsets are measured from the first byte after the leading `_`
                let offset = self.appended.len().to_string();
                attributes.push(("offset", offset.as_str()));

                let element = BytesStart::new("DataArray").with_attributes(attributes);
                self.xml.write_event(Event::Empty(element))?;

                push_block(&mut self.appended, array);
            }
        }

        Ok(())
    }

    /// write out any appended binary data, close the `VTKFile` element and hand back the
    /// underlying writer
    pub(crate) fn finish(mut self) -> Result<W, Error> {
        if !self.appended.is_empty() {
            appended_binary_header_start(&mut self.xml)?;
            self.xml.inner().write_all(&self.appended)?;
            appended_binary_header_end(&mut self.xml)?;
        }

        self.xml.write_event(Event::End(BytesEnd::new("VTKFile")))?;
        Ok(self.xml.into_inner())
    }
}

/// append a UInt64 byte count followed by the payload of `array`
fn push_block<A: Array + ?Sized>(bytes: &mut Vec<u8>, array: &A) {
    bytes.extend_from_slice(&(array.byte_len() as u64).to_le_bytes());
    array.extend_le_bytes(bytes);
}

fn appended_binary_header_start<W: Write>(writer: &mut Writer<W>) -> Result<(), std::io::Error> {
    let inner = writer.inner();
    inner.write_all(b"\n  <AppendedData encoding=\"raw\">_")?;
    Ok(())
}

fn appended_binary_header_end<W: Write>(writer: &mut Writer<W>) -> Result<(), std::io::Error> {
    let inner = writer.inner();
    inner.write_all(b"\n  </AppendedData>")?;
    Ok(())
}

/// the data type of the values in a `DataArray`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Float32,
    Float64,
    Int64,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Int64 => "Int64",
        }
    }

    /// size of a single value in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 | Self::Int64 => 8,
        }
    }
}

/// how the values of a `DataArray` are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// inline, space separated text
    Ascii,
    /// inline, base64 encoded bytes with a byte count header
    Base64,
    /// raw bytes in the `<AppendedData>` section, referenced by offset
    Appended,
}

impl Format {
    fn attribute(&self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Base64 => "binary",
            Self::Appended => "appended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    struct Line;

    impl Domain for Line {
        fn dataset_type(&self) -> &'static str {
            "ImageData"
        }

        fn dataset_attributes(&self) -> Vec<(&'static str, String)> {
            vec![("WholeExtent", "0 2 0 0 0 0".to_string())]
        }

        fn piece_attributes(&self) -> Vec<(&'static str, String)> {
            vec![("Extent", "0 2 0 0 0 0".to_string())]
        }

        fn write_geometry<W: Write, E: Encode>(&self, _: &mut ArrayWriter<W, E>) -> Result<(), Error> {
            Ok(())
        }
    }

    struct Fields {
        rho: Vec<f64>,
        u: Vec<[f64; 3]>,
    }

    impl DataArray for Fields {
        fn write_point_data<W: Write, E: Encode>(
            &self,
            writer: &mut ArrayWriter<W, E>,
        ) -> Result<(), Error> {
            writer.write_array("rho", self.rho.as_slice())?;
            writer.write_array("u", self.u.as_slice())?;
            Ok(())
        }
    }

    fn data() -> VtkData<Line, Fields> {
        VtkData::new(
            Line,
            Fields {
                rho: vec![1.0, 2.5, 3.0],
                u: vec![[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.2, 0.0, 0.0]],
            },
        )
    }

    #[test]
    fn ascii_inline() {
        let mut out = Vec::new();
        write_vtk::<_, _, _, Ascii>(&mut out, &data()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<VTKFile type=\"ImageData\""));
        assert!(text.contains("header_type=\"UInt64\""));
        assert!(text.contains(
            "<DataArray type=\"Float64\" Name=\"rho\" NumberOfComponents=\"1\" format=\"ascii\">1.0 2.5 3.0</DataArray>"
        ));
        assert!(text.contains("NumberOfComponents=\"3\" format=\"ascii\">0.0 0.0 0.0 0.1 0.0 0.0 0.2 0.0 0.0<"));
        assert!(!text.contains("AppendedData"));
        assert!(text.trim_end().ends_with("</VTKFile>"));
    }

    #[test]
    fn appended_offsets_include_headers() {
        let mut out = Vec::new();
        write_vtk::<_, _, _, Binary>(&mut out, &data()).unwrap();

        let marker = b"<AppendedData encoding=\"raw\">_";
        let start = out
            .windows(marker.len())
            .position(|w| w == marker)
            .unwrap()
            + marker.len();

        let header = String::from_utf8_lossy(&out[..start]);
        assert!(header.contains("Name=\"rho\" NumberOfComponents=\"1\" format=\"appended\" offset=\"0\""));
        // 8 byte header + 3 * 8 byte values
        assert!(header.contains("Name=\"u\" NumberOfComponents=\"3\" format=\"appended\" offset=\"32\""));

        let raw = &out[start..];
        assert_eq!(u64::from_le_bytes(raw[0..8].try_into().unwrap()), 24);
        assert_eq!(f64::from_le_bytes(raw[16..24].try_into().unwrap()), 2.5);
        assert_eq!(u64::from_le_bytes(raw[32..40].try_into().unwrap()), 72);
        assert_eq!(f64::from_le_bytes(raw[64..72].try_into().unwrap()), 0.1);
    }

    #[test]
    fn base64_inline_has_header() {
        let mut out = Vec::new();
        write_vtk::<_, _, _, Base64>(&mut out, &data()).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&24u64.to_le_bytes());
        for value in [1.0f64, 2.5, 3.0] {
            expected.extend_from_slice(&value.to_le_bytes());
        }

        assert!(text.contains("format=\"binary\""));
        assert!(text.contains(&base64::encode(&expected)));
    }
}
