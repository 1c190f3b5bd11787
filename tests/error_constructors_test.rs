use chargebridge::error::{BridgeError, DecodeError};

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        BridgeError::config("x"),
        BridgeError::Config { .. }
    ));
    assert!(matches!(
        BridgeError::transport("x"),
        BridgeError::Transport { .. }
    ));
    assert!(matches!(
        BridgeError::shutdown("x"),
        BridgeError::Shutdown { .. }
    ));
    assert!(matches!(BridgeError::io("x"), BridgeError::Io { .. }));
}

#[test]
fn error_constructors_group_2() {
    let ser = BridgeError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, BridgeError::Serialization { .. }));
    assert!(matches!(
        BridgeError::validation("f", "m"),
        BridgeError::Validation { .. }
    ));
    assert!(matches!(
        BridgeError::generic("x"),
        BridgeError::Generic { .. }
    ));
    assert!(matches!(
        BridgeError::from(DecodeError::Truncated { len: 2 }),
        BridgeError::Decode(DecodeError::Truncated { len: 2 })
    ));
}

#[test]
fn display_messages() {
    let e = BridgeError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));

    let e = BridgeError::from(DecodeError::UnsupportedFunction { code: 16 });
    assert_eq!(format!("{}", e), "Decode error: unsupported function code 16");
}
