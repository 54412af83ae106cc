//! The pay-to-key-hash-with-attenuation-model template's parameter blob.
//!
//! The grammar chosen here: a sequence of `(unlock_height, unlock_ratio)`
//! pairs, `unlock_ratio` a per-mille fraction (`0..=1000`) of the locked
//! quantity released at or after `unlock_height`, pairs in strictly
//! increasing height order and summing to exactly 1000. This is this
//! module's own invention, not recovered from upstream, which only
//! surfaces `asset_mit.cpp`/`attachment.cpp`-style attachments, not the
//! attenuation blob itself.

use std::convert::TryInto;

use crate::error::ScriptError;

/// One unlock point: at `height`, an additional `ratio` per-mille of the
/// originally locked quantity becomes spendable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnlockPoint {
    pub height: u32,
    pub ratio_per_mille: u16,
}

/// A parsed attenuation-model blob.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttenuationModel {
    pub points: Vec<UnlockPoint>,
}

impl AttenuationModel {
    /// Parses a blob of the form `count:u8, (height:u32 LE, ratio:u16 LE){count}`.
    pub fn parse(bytes: &[u8]) -> Result<AttenuationModel, ScriptError> {
        let mut cursor = bytes;
        let count = take_u8(&mut cursor)?;
        if count == 0 {
            return Err(ScriptError::InvalidAttenuationModel("model has no unlock points"));
        }

        let mut points = Vec::with_capacity(count as usize);
        let mut previous_height = None;
        let mut total_ratio: u32 = 0;
        for _ in 0..count {
            let height = take_u32(&mut cursor)?;
            let ratio_per_mille = take_u16(&mut cursor)?;

            if let Some(previous) = previous_height {
                if height <= previous {
                    return Err(ScriptError::InvalidAttenuationModel(
                        "unlock points must be in strictly increasing height order",
                    ));
                }
            }
            previous_height = Some(height);
            total_ratio += ratio_per_mille as u32;

            points.push(UnlockPoint {
                height,
                ratio_per_mille,
            });
        }

        if total_ratio != 1000 {
            return Err(ScriptError::InvalidAttenuationModel(
                "unlock ratios must sum to exactly 1000",
            ));
        }
        if !cursor.is_empty() {
            return Err(ScriptError::InvalidAttenuationModel("trailing bytes after unlock points"));
        }

        Ok(AttenuationModel { points })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.points.len() * 6);
        bytes.push(self.points.len() as u8);
        for point in &self.points {
            bytes.extend_from_slice(&point.height.to_le_bytes());
            bytes.extend_from_slice(&point.ratio_per_mille.to_le_bytes());
        }
        bytes
    }

    /// The per-mille fraction of the locked quantity that has vested by
    /// `current_height`: the sum of every point reached so far.
    pub fn vested_ratio_per_mille(&self, current_height: u32) -> u32 {
        self.points
            .iter()
            .filter(|point| point.height <= current_height)
            .map(|point| point.ratio_per_mille as u32)
            .sum()
    }

    /// Given the originally locked quantity, how much of it is currently
    /// spendable.
    pub fn vested_quantity(&self, locked_quantity: u64, current_height: u32) -> u64 {
        let ratio = self.vested_ratio_per_mille(current_height) as u128;
        ((locked_quantity as u128 * ratio) / 1000) as u64
    }

    /// A transfer of a locked asset is only valid if the outgoing locked
    /// output keeps the same model and the quantity moved out as "unlocked"
    /// does not exceed what has vested.
    pub fn validates_transfer(
        &self,
        locked_quantity_in: u64,
        locked_quantity_out: u64,
        unlocked_quantity_out: u64,
        current_height: u32,
    ) -> Result<(), ScriptError> {
        let vested = self.vested_quantity(locked_quantity_in, current_height);
        let spent = locked_quantity_in.saturating_sub(locked_quantity_out);
        if spent > vested || spent != unlocked_quantity_out {
            return Err(ScriptError::AttenuationViolation);
        }
        Ok(())
    }
}

fn take_u8(cursor: &mut &[u8]) -> Result<u8, ScriptError> {
    let (first, rest) = cursor
        .split_first()
        .ok_or(ScriptError::InvalidAttenuationModel("unexpected end of blob"))?;
    *cursor = rest;
    Ok(*first)
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32, ScriptError> {
    if cursor.len() < 4 {
        return Err(ScriptError::InvalidAttenuationModel("unexpected end of blob"));
    }
    let (bytes, rest) = cursor.split_at(4);
    *cursor = rest;
    Ok(u32::from_le_bytes(bytes.try_into().expect("checked length")))
}

fn take_u16(cursor: &mut &[u8]) -> Result<u16, ScriptError> {
    if cursor.len() < 2 {
        return Err(ScriptError::InvalidAttenuationModel("unexpected end of blob"));
    }
    let (bytes, rest) = cursor.split_at(2);
    *cursor = rest;
    Ok(u16::from_le_bytes(bytes.try_into().expect("checked length")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttenuationModel {
        AttenuationModel {
            points: vec![
                UnlockPoint {
                    height: 100,
                    ratio_per_mille: 500,
                },
                UnlockPoint {
                    height: 200,
                    ratio_per_mille: 500,
                },
            ],
        }
    }

    #[test]
    fn roundtrips_through_bytes() {
        let model = sample();
        let bytes = model.serialize();
        let parsed = AttenuationModel::parse(&bytes).unwrap();
        assert_eq!(model, parsed);
    }

    #[test]
    fn rejects_ratios_not_summing_to_1000() {
        let bytes = AttenuationModel {
            points: vec![UnlockPoint {
                height: 100,
                ratio_per_mille: 999,
            }],
        }
        .serialize();
        assert!(AttenuationModel::parse(&bytes).is_err());
    }

    #[test]
    fn vesting_accumulates_with_height() {
        let model = sample();
        assert_eq!(model.vested_quantity(1000, 0), 0);
        assert_eq!(model.vested_quantity(1000, 100), 500);
        assert_eq!(model.vested_quantity(1000, 200), 1000);
        assert_eq!(model.vested_quantity(1000, 1_000_000), 1000);
    }
}
