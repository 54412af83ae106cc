use proptest::prelude::*;
use std::io::Cursor;

use super::*;

use crate::serialization::{BitcoinDeserialize, BitcoinDeserializeInto, BitcoinSerialize};

proptest! {
    #[test]
    fn outpoint_roundtrip(outpoint in any::<OutPoint>()) {
        mvs_test::init();

        let data = outpoint.bitcoin_serialize_to_vec().expect("outpoint should serialize");
        let outpoint2 = data.bitcoin_deserialize_into().expect("randomized outpoint should deserialize");

        prop_assert_eq![outpoint, outpoint2];
    }

    #[test]
    fn output_roundtrip(output in any::<Output>()) {
        mvs_test::init();

        let data = output.bitcoin_serialize_to_vec().expect("output should serialize");
        let output2 = data.bitcoin_deserialize_into().expect("randomized output should deserialize");

        prop_assert_eq![output, output2];
    }

    // `height` on a coinbase input isn't part of the wire encoding (it's
    // reconstructed by the caller from the block header, which now carries
    // its own height field directly), so only `data`/`sequence` round-trip.
    #[test]
    fn coinbase_input_roundtrip(input in Input::coinbase_strategy(block::Height(0))) {
        mvs_test::init();

        let mut bytes = Cursor::new(Vec::new());
        input.bitcoin_serialize(&mut bytes)?;

        bytes.set_position(0);
        let other_input = Input::bitcoin_deserialize(&mut bytes)?;

        match (input, other_input) {
            (
                Input::Coinbase { data, sequence, .. },
                Input::Coinbase { data: data2, sequence: sequence2, .. },
            ) => {
                prop_assert_eq![data, data2];
                prop_assert_eq![sequence, sequence2];
            }
            _ => prop_assert!(false, "expected both inputs to be coinbase inputs"),
        }
    }

    #[test]
    fn prevout_input_roundtrip(input in Input::prevout_strategy()) {
        mvs_test::init();

        let mut bytes = Cursor::new(Vec::new());
        input.bitcoin_serialize(&mut bytes)?;

        bytes.set_position(0);
        let other_input = Input::bitcoin_deserialize(&mut bytes)?;

        prop_assert_eq![input, other_input];
    }
}
