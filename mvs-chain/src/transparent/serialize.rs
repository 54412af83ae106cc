//! Wire format for transparent inputs.
//!
//! `Input` is a hand-rolled enum (not a `BtcSerialize`/`BtcDeserialize`
//! derive target) because which variant it decodes to is itself
//! wire-encoded, Bitcoin-style: a coinbase input is a `PrevOut`-shaped
//! input whose outpoint is the all-zero hash paired with an all-ones index,
//! rather than a separate tag byte.

use std::io;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use crate::transaction;

use super::{CoinbaseData, Input, OutPoint, Script};

/// The `OutPoint` index value that marks an input as a coinbase input.
const COINBASE_INDEX: u32 = u32::MAX;

fn coinbase_outpoint() -> OutPoint {
    OutPoint {
        hash: transaction::Hash([0; 32]),
        index: COINBASE_INDEX,
    }
}

impl BitcoinSerialize for Input {
    fn bitcoin_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        match self {
            Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            } => {
                outpoint.bitcoin_serialize(&mut writer)?;
                unlock_script.bitcoin_serialize(&mut writer)?;
                sequence.bitcoin_serialize(&mut writer)
            }
            Input::Coinbase { data, sequence, .. } => {
                coinbase_outpoint().bitcoin_serialize(&mut writer)?;
                data.bitcoin_serialize(&mut writer)?;
                sequence.bitcoin_serialize(&mut writer)
            }
        }
    }
}

impl BitcoinDeserialize for Input {
    fn bitcoin_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let outpoint = OutPoint::bitcoin_deserialize(&mut reader)?;
        if outpoint == coinbase_outpoint() {
            let data = CoinbaseData::bitcoin_deserialize(&mut reader)?;
            let sequence = u32::bitcoin_deserialize(&mut reader)?;
            Ok(Input::Coinbase {
                height: None,
                data,
                sequence,
            })
        } else {
            let unlock_script = Script::bitcoin_deserialize(&mut reader)?;
            let sequence = u32::bitcoin_deserialize(&mut reader)?;
            Ok(Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            })
        }
    }
}
