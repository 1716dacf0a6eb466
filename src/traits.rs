//! # Traits
//!
//! General purpose traits required to write vtk files. A file is a [`Domain`] (the dataset
//! element and any geometry arrays it carries) together with a [`DataArray`] (the arrays in
//! the `<PointData>` section). Both are written through an
//! [`ArrayWriter`](crate::ArrayWriter), which decides how each array is encoded.
//!

use crate::write_vtk::{ArrayWriter, Format, Precision};
use crate::Error;
use std::io::Write;

/// Describes the dataset element of a vtk file.
///
/// For an `ImageData` file, the domain carries the extents, the origin, and the spacing
/// as attributes and writes no arrays. A `PolyData` domain writes its `<Points>` and
/// `<Polys>` sections from `write_geometry`.
///
/// A file is generated in the following format (binary encoding):
///
/// ```ignore
/// <?xml version="1.0" encoding="UTF-8"?>
/// <VTKFile type="ImageData" version="1.0" byte_order="LittleEndian" header_type="UInt64">
///   <ImageData WholeExtent="0 0 0 0 0 2" Origin="0 0 0" Spacing="0.1 0.1 0.1">
///     <Piece Extent="0 0 0 0 0 2">
///       <PointData Scalars="density" Vectors="velocity">
///         <DataArray type="Float64" Name="density" NumberOfComponents="1" format="appended" offset="0"/>
///         <DataArray type="Float64" Name="velocity" NumberOfComponents="3" format="appended" offset="32"/>
///       </PointData>
///     </Piece>
///   </ImageData>
///   <AppendedData encoding="raw">_binary data here</AppendedData>
/// </VTKFile>
/// ```
pub trait Domain {
    /// the name of the dataset element, also used as the `type` of the `VTKFile`
    fn dataset_type(&self) -> &'static str;

    /// attributes of the dataset element
    fn dataset_attributes(&self) -> Vec<(&'static str, String)>;

    /// attributes of the single `<Piece>` element
    fn piece_attributes(&self) -> Vec<(&'static str, String)>;

    /// Write every array that describes the geometry of the dataset.
    /// This is called inside `<Piece>`, before `<PointData>`.
    fn write_geometry<W: Write, E: Encode>(
        &self,
        writer: &mut ArrayWriter<W, E>,
    ) -> Result<(), Error>;
}

/// describes how to write the point data arrays of a vtk file
pub trait DataArray {
    /// the `Scalars` / `Vectors` attributes of the `<PointData>` element, marking the
    /// arrays a viewer should show by default
    fn active_attributes(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Write all the arrays in the `<PointData>` section of the file
    fn write_point_data<W: Write, E: Encode>(
        &self,
        writer: &mut ArrayWriter<W, E>,
    ) -> Result<(), Error>;
}

impl DataArray for () {
    fn write_point_data<W: Write, E: Encode>(&self, _: &mut ArrayWriter<W, E>) -> Result<(), Error> {
        Ok(())
    }
}

/// A contiguous block of numbers that can be written as a single `<DataArray>`
pub trait Array {
    fn precision(&self) -> Precision;

    /// number of components per tuple
    fn components(&self) -> usize {
        1
    }

    /// number of tuples
    fn length(&self) -> usize;

    /// append the little endian bytes of every value
    fn extend_le_bytes(&self, bytes: &mut Vec<u8>);

    /// append the ascii representation of every value, space separated
    fn push_ascii(&self, out: &mut String);

    /// size of the raw payload in bytes
    fn byte_len(&self) -> usize {
        self.length() * self.components() * self.precision().size()
    }
}

/// A number that can be stored in a vtk file
pub trait Numeric: Copy + num_traits::ToBytes {
    const PRECISION: Precision;

    fn push_ascii(self, out: &mut String);
}

impl Numeric for f64 {
    const PRECISION: Precision = Precision::Float64;

    fn push_ascii(self, out: &mut String) {
        let mut buffer = ryu::Buffer::new();
        out.push_str(buffer.format(self));
    }
}

impl Numeric for f32 {
    const PRECISION: Precision = Precision::Float32;

    fn push_ascii(self, out: &mut String) {
        let mut buffer = ryu::Buffer::new();
        out.push_str(buffer.format(self));
    }
}

impl Numeric for i64 {
    const PRECISION: Precision = Precision::Int64;

    fn push_ascii(self, out: &mut String) {
        out.push_str(&self.to_string());
    }
}

/// Marker for how data arrays are laid out in the file
pub trait Encode {
    const FORMAT: Format;
}
