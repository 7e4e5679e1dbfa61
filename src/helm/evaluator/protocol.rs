//! Byte layout of evaluator requests and responses.
//!
//! Request: the template as a name/content pair, a dependency count, then one
//! name/content pair per dependency. Every string is a big-endian `u32` byte
//! length followed by its UTF-8 bytes. The response is a single protobuf
//! message with no length prefix.

use std::io::{self, Write};

use prost::Message;

use super::EvaluationRequest;
use crate::helm::ast::wire::TemplateEvaluationResult;

fn write_string<W: Write>(out: &mut W, value: &str) -> io::Result<()> {
    let len = u32::try_from(value.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("string of {} bytes does not fit the request format", value.len()),
        )
    })?;
    out.write_all(&len.to_be_bytes())?;
    out.write_all(value.as_bytes())
}

/// Serialize `request` into `out`. Dependencies are written in name order.
pub fn write_request<W: Write>(out: &mut W, request: &EvaluationRequest) -> io::Result<()> {
    write_string(out, &request.path)?;
    write_string(out, &request.content)?;

    let count = u32::try_from(request.dependencies.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "too many dependencies")
    })?;
    out.write_all(&count.to_be_bytes())?;
    for (name, content) in &request.dependencies {
        write_string(out, name)?;
        write_string(out, content)?;
    }
    Ok(())
}

pub fn encode_request(request: &EvaluationRequest) -> io::Result<Vec<u8>> {
    let size = 12
        + request.path.len()
        + request.content.len()
        + request
            .dependencies
            .iter()
            .map(|(name, content)| 8 + name.len() + content.len())
            .sum::<usize>();
    let mut buffer = Vec::with_capacity(size);
    write_request(&mut buffer, request)?;
    Ok(buffer)
}

pub fn decode_response(bytes: &[u8]) -> Result<TemplateEvaluationResult, prost::DecodeError> {
    TemplateEvaluationResult::decode(bytes)
}
