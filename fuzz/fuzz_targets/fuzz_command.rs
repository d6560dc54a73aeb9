#![no_main]

use libfuzzer_sys::fuzz_target;
use wordparty_client::codec;

fuzz_target!(|data: &[u8]| {
    // Anything the server-side decoder accepts must re-encode and decode to
    // the same command.
    if let Ok(command) = codec::decode_command(data) {
        if let Ok(frame) = codec::encode(&command) {
            assert_eq!(codec::decode_command(frame.as_bytes()).ok(), Some(command));
        }
    }
});
