//! Common traits and types that are useful for working with `fluid-vtk`
#![allow(unused_imports)]

pub use crate::data::VtkData;
pub use crate::traits::{Array, DataArray, Domain, Encode, Numeric};
pub use crate::write_vtk::{ArrayWriter, Format, Precision};
pub use crate::{Ascii, Base64, Binary};
pub use crate::{GridSpec, MeshFrame, VolumeFrame};

pub(crate) use crate::Error;
pub(crate) use std::io::Write;
pub(crate) use std::sync::Arc;

pub(crate) use derive_more::{Constructor, Deref, Display, Into};
