#![no_main]

use libfuzzer_sys::fuzz_target;
use wordparty_client::session::{Intent, Session};
use wordparty_client::{codec, StoredIdentity};

fuzz_target!(|data: &[u8]| {
    let _ = codec::decode(data);

    // Whatever arrives, the session must neither panic nor break its roster.
    let mut session = Session::new(StoredIdentity::default());
    let _ = session.connect();
    for frame in data.split(|b| *b == b'\n') {
        session.receive(frame);
        let _ = session.intent(Intent::StartGame);
    }
    let members = &session.snapshot().group.members;
    for (i, m) in members.iter().enumerate() {
        assert!(members.iter().skip(i + 1).all(|other| other.uid != m.uid));
    }
});
