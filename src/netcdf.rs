//! Minimal reader for netCDF classic (CDF-1) and 64-bit offset (CDF-2) files.

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

const HDF5_MAGIC: &[u8; 8] = b"\x89HDF\r\n\x1a\n";
const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;
const ABSENT: u32 = 0;
// Header counts come from upstream bytes; grow past this instead of trusting them.
const MAX_PREALLOCATED: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NcType {
    Byte,
    Char,
    Short,
    Int,
    Float,
    Double,
}

impl NcType {
    fn from_code(code: u32) -> Result<Self> {
        Ok(match code {
            1 => NcType::Byte,
            2 => NcType::Char,
            3 => NcType::Short,
            4 => NcType::Int,
            5 => NcType::Float,
            6 => NcType::Double,
            other => bail!("Unsupported netCDF type code {other}"),
        })
    }

    fn size(self) -> usize {
        match self {
            NcType::Byte | NcType::Char => 1,
            NcType::Short => 2,
            NcType::Int | NcType::Float => 4,
            NcType::Double => 8,
        }
    }

    fn decode(self, raw: &[u8]) -> Option<f64> {
        match self {
            NcType::Byte => raw.first().map(|value| f64::from(*value as i8)),
            NcType::Char => None,
            NcType::Short => Some(f64::from(i16::from_be_bytes(raw.try_into().ok()?))),
            NcType::Int => Some(f64::from(i32::from_be_bytes(raw.try_into().ok()?))),
            NcType::Float => Some(f64::from(f32::from_be_bytes(raw.try_into().ok()?))),
            NcType::Double => Some(f64::from_be_bytes(raw.try_into().ok()?)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Numbers(Vec<f64>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dim_ids: Vec<u32>,
    pub attributes: Vec<Attribute>,
    pub nc_type: NcType,
    pub begin: u64,
}

impl Variable {
    fn text_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .and_then(|attribute| match &attribute.value {
                AttributeValue::Text(text) => Some(text.as_str()),
                AttributeValue::Numbers(_) => None,
            })
    }

    fn number_attribute(&self, name: &str) -> Option<f64> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .and_then(|attribute| match &attribute.value {
                AttributeValue::Numbers(values) => values.first().copied(),
                AttributeValue::Text(_) => None,
            })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub dimensions: Vec<(String, u32)>,
    pub variables: Vec<Variable>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| anyhow!("netCDF header truncated at byte {}", self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    fn padded(&mut self, len: usize) -> Result<&'a [u8]> {
        let slice = self.take(len)?;
        self.take((4 - len % 4) % 4)?;
        Ok(slice)
    }

    fn name(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.padded(len)?;
        String::from_utf8(bytes.to_vec()).context("netCDF name is not UTF-8")
    }

    fn list_len(&mut self, expected_tag: u32) -> Result<usize> {
        let tag = self.u32()?;
        let count = self.u32()? as usize;
        match tag {
            ABSENT if count == 0 => Ok(0),
            tag if tag == expected_tag => Ok(count),
            other => bail!("Unexpected netCDF list tag {other:#x}"),
        }
    }

    fn attributes(&mut self) -> Result<Vec<Attribute>> {
        let count = self.list_len(NC_ATTRIBUTE)?;
        let mut attributes = Vec::with_capacity(count.min(MAX_PREALLOCATED));
        for _ in 0..count {
            let name = self.name()?;
            let nc_type = NcType::from_code(self.u32()?)?;
            let len = self.u32()? as usize;
            let raw = self.padded(len * nc_type.size())?;
            let value = if nc_type == NcType::Char {
                AttributeValue::Text(String::from_utf8_lossy(raw).into_owned())
            } else {
                AttributeValue::Numbers(
                    raw.chunks_exact(nc_type.size())
                        .filter_map(|chunk| nc_type.decode(chunk))
                        .collect(),
                )
            };
            attributes.push(Attribute { name, value });
        }
        Ok(attributes)
    }
}

pub fn parse_header(data: &[u8]) -> Result<Header> {
    if data.starts_with(HDF5_MAGIC) {
        bail!("netCDF-4/HDF5 payloads are not supported");
    }
    let mut reader = Reader { data, pos: 0 };
    let magic = reader.take(4)?;
    if &magic[..3] != b"CDF" {
        bail!("Invalid netCDF magic");
    }
    let version = magic[3];
    if version != 1 && version != 2 {
        bail!("Unsupported netCDF version {version}");
    }
    let _numrecs = reader.u32()?;

    let dim_count = reader.list_len(NC_DIMENSION)?;
    let mut dimensions = Vec::with_capacity(dim_count.min(MAX_PREALLOCATED));
    for _ in 0..dim_count {
        let name = reader.name()?;
        let len = reader.u32()?;
        dimensions.push((name, len));
    }

    let _global_attributes = reader.attributes()?;

    let var_count = reader.list_len(NC_VARIABLE)?;
    let mut variables = Vec::with_capacity(var_count.min(MAX_PREALLOCATED));
    for _ in 0..var_count {
        let name = reader.name()?;
        let ndims = reader.u32()? as usize;
        let mut dim_ids = Vec::with_capacity(ndims.min(MAX_PREALLOCATED));
        for _ in 0..ndims {
            dim_ids.push(reader.u32()?);
        }
        let attributes = reader.attributes()?;
        let nc_type = NcType::from_code(reader.u32()?)?;
        let _vsize = reader.u32()?;
        let begin = if version == 1 {
            u64::from(reader.u32()?)
        } else {
            reader.u64()?
        };
        variables.push(Variable {
            name,
            dim_ids,
            attributes,
            nc_type,
            begin,
        });
    }

    Ok(Header {
        dimensions,
        variables,
    })
}

/// First value of `variable`, unpacked. Fill or missing values are an error.
pub fn read_first_value(data: &[u8], variable: &str) -> Result<f64> {
    let header = parse_header(data)?;
    let var = header
        .variables
        .iter()
        .find(|candidate| candidate.name == variable)
        .ok_or_else(|| anyhow!("netCDF variable {variable} not found"))?;
    if let Some(dim_id) = var
        .dim_ids
        .iter()
        .find(|dim_id| **dim_id as usize >= header.dimensions.len())
    {
        bail!("netCDF variable {variable} references unknown dimension {dim_id}");
    }

    let start = usize::try_from(var.begin).context("netCDF offset out of range")?;
    let raw = start
        .checked_add(var.nc_type.size())
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| anyhow!("netCDF data for {variable} is truncated"))?;
    let value = var
        .nc_type
        .decode(raw)
        .ok_or_else(|| anyhow!("netCDF variable {variable} is not numeric"))?;

    for sentinel in ["_FillValue", "missing_value"] {
        if var.number_attribute(sentinel) == Some(value) {
            bail!("netCDF variable {variable} holds {sentinel}");
        }
    }
    if !value.is_finite() {
        bail!("netCDF variable {variable} is not finite");
    }

    let scale = var.number_attribute("scale_factor").unwrap_or(1.0);
    let offset = var.number_attribute("add_offset").unwrap_or(0.0);
    debug!(
        variable,
        raw = value,
        units = var.text_attribute("units").unwrap_or("unknown"),
        "netCDF value decoded"
    );
    Ok(value * scale + offset)
}
