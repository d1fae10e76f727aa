use byteorder::{BigEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};

use crate::error::AssignmentError;

/// Decodes a consumer-protocol `MemberAssignment` into topic -> partitions.
///
/// Layout (all versions share this prefix):
///
/// version          short   2 bytes
/// topic count      int     4 bytes
///   topic          string  (int16 length + UTF-8)
///   partition count int    4 bytes
///     partition    int     4 bytes
/// user data        bytes   (int32 length, -1 for null)
///
/// Trailing user data is not needed and is ignored.
pub fn decode_member_assignment(
    bytes: &[u8],
) -> Result<BTreeMap<String, Vec<i32>>, AssignmentError> {
    let mut assignments = BTreeMap::new();
    if bytes.is_empty() {
        return Ok(assignments);
    }

    let mut cursor = Cursor::new(bytes);

    let _version = cursor.read_i16::<BigEndian>()?;
    let topic_count = read_array_len(&mut cursor)?;

    for _ in 0..topic_count {
        let topic = consume_string(&mut cursor)?;
        let partition_count = read_array_len(&mut cursor)?;
        ensure_remaining(&cursor, partition_count.saturating_mul(4))?;

        let mut partitions = Vec::with_capacity(partition_count);
        for _ in 0..partition_count {
            partitions.push(cursor.read_i32::<BigEndian>()?);
        }

        assignments
            .entry(topic)
            .or_insert_with(Vec::new)
            .extend(partitions);
    }

    Ok(assignments)
}

fn read_array_len(cursor: &mut Cursor<&[u8]>) -> Result<usize, AssignmentError> {
    let len = cursor.read_i32::<BigEndian>()?;
    match len {
        -1 => Ok(0),
        len if len < 0 => Err(AssignmentError::NegativeLength(len)),
        len => Ok(len as usize),
    }
}

/// Lengths come off the wire; check them against what is left before allocating.
fn ensure_remaining(cursor: &Cursor<&[u8]>, needed: usize) -> Result<(), AssignmentError> {
    let remaining = cursor
        .get_ref()
        .len()
        .saturating_sub(cursor.position() as usize);
    if needed > remaining {
        return Err(AssignmentError::Truncated(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{} bytes declared, {} left", needed, remaining),
        )));
    }
    Ok(())
}

fn consume_string(cursor: &mut Cursor<&[u8]>) -> Result<String, AssignmentError> {
    let string_length = cursor.read_i16::<BigEndian>()?;
    if string_length < 0 {
        return Err(AssignmentError::NegativeLength(string_length as i32));
    }

    ensure_remaining(cursor, string_length as usize)?;

    let mut string_buffer = vec![0; string_length as usize];
    cursor.read_exact(&mut string_buffer)?;

    Ok(String::from_utf8(string_buffer)?)
}

#[cfg(test)]
pub(crate) fn encode_member_assignment(topics: &[(&str, &[i32])]) -> Vec<u8> {
    use byteorder::WriteBytesExt;

    let mut buffer = Vec::new();
    buffer.write_i16::<BigEndian>(0).unwrap();
    buffer.write_i32::<BigEndian>(topics.len() as i32).unwrap();
    for (topic, partitions) in topics {
        buffer.write_i16::<BigEndian>(topic.len() as i16).unwrap();
        buffer.extend_from_slice(topic.as_bytes());
        buffer
            .write_i32::<BigEndian>(partitions.len() as i32)
            .unwrap();
        for partition in partitions.iter() {
            buffer.write_i32::<BigEndian>(*partition).unwrap();
        }
    }
    buffer.write_i32::<BigEndian>(-1).unwrap();
    buffer
}
