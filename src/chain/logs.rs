//! Address extraction from receipt logs.
//!
//! Addresses appear either in a log's body as ABI words or as an indexed
//! event topic. Only the first log carrying the requested field is read.

use alloy::primitives::{Address, B256};

use crate::chain::types::Log;
use crate::error::{IpcError, IpcResult};

const WORD: usize = 32;

/// Where the address lives in a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogField {
    /// Every 32-byte word of the log body.
    Data,
    /// The topic at this index (0 is the event signature).
    Topic(usize),
}

impl LogField {
    fn present_in(&self, log: &Log) -> bool {
        match self {
            LogField::Data => log.data.len() >= WORD,
            LogField::Topic(index) => log.topics.len() > *index,
        }
    }
}

fn word_to_address(word: &B256) -> IpcResult<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(IpcError::schema(
            "log",
            format!("{word} is not a left-padded address"),
        ));
    }
    Ok(Address::from_word(*word))
}

/// Decode the addresses held in `field` of the first log that has it.
/// Returns an empty vector when no log matches.
pub fn decode_addresses(logs: &[Log], field: LogField) -> IpcResult<Vec<Address>> {
    let Some(log) = logs.iter().find(|log| field.present_in(log)) else {
        return Ok(Vec::new());
    };

    match field {
        LogField::Data => {
            if log.data.len() % WORD != 0 {
                return Err(IpcError::schema(
                    "log",
                    format!("data length {} is not a whole number of words", log.data.len()),
                ));
            }
            log.data
                .chunks_exact(WORD)
                .map(|chunk| word_to_address(&B256::from_slice(chunk)))
                .collect()
        }
        LogField::Topic(index) => word_to_address(&log.topics[index]).map(|a| vec![a]),
    }
}

/// First decoded address, if any log matched.
pub fn first_address(logs: &[Log], field: LogField) -> IpcResult<Option<Address>> {
    Ok(decode_addresses(logs, field)?.into_iter().next())
}
