mod common;
use common::*;
use timnet_bridge::mqtt::Message;
use timnet_bridge::prelude::*;
use timnet_bridge::register_cache::reading_from_words;

use std::sync::Arc;

fn state(words: &[u16], connection_healthy: bool) -> Arc<CachedState> {
    Arc::new(CachedState {
        last_good_reading: reading_from_words(words),
        connection_healthy,
    })
}

fn payload<'a>(messages: &'a [Message], topic: &str) -> Option<&'a str> {
    messages
        .iter()
        .find(|m| m.topic == topic)
        .map(|m| m.payload.as_str())
}

#[test]
fn only_connection_before_first_reading() -> Result<()> {
    let messages = Message::for_state(&Factory::controller(), Arc::default())?;

    assert_eq!(
        messages,
        vec![
            Message {
                topic: "boiler/connection".to_string(),
                retain: true,
                payload: "offline".to_string(),
            },
            Message {
                topic: "boiler/connection/attributes".to_string(),
                retain: true,
                payload: r#"{"host":"10.0.0.11","port":502}"#.to_string(),
            },
        ]
    );

    Ok(())
}

#[test]
fn full_state() -> Result<()> {
    let messages = Message::for_state(
        &Factory::controller(),
        state(&Factory::burning_block(), true),
    )?;

    assert!(messages.iter().all(|m| m.retain));
    assert_eq!(payload(&messages, "boiler/connection"), Some("online"));
    assert_eq!(payload(&messages, "boiler/variant"), Some("TimNet 200"));
    assert_eq!(payload(&messages, "boiler/door"), Some("closed"));
    assert_eq!(payload(&messages, "boiler/TT"), Some("21.5"));
    assert_eq!(payload(&messages, "boiler/TT/raw"), Some("215"));
    assert_eq!(payload(&messages, "boiler/CAS"), Some("20.0"));
    assert_eq!(payload(&messages, "boiler/SER1"), Some("50"));
    assert_eq!(
        payload(&messages, "boiler/STAT"),
        Some("\"Hoření (vzrůstající teplota)\"")
    );
    assert_eq!(payload(&messages, "boiler/RELE1"), Some("\"Sepnuto\""));

    let attributes: serde_json::Value =
        serde_json::from_str(payload(&messages, "boiler/P_LIFE/attributes").unwrap())?;
    assert_eq!(attributes["address"], "0x0015");
    assert_eq!(attributes["raw_value"], 1234);

    let door: serde_json::Value =
        serde_json::from_str(payload(&messages, "boiler/door/attributes").unwrap())?;
    assert_eq!(door["address"], "0x0004");
    assert_eq!(door["register_key"], "INP");
    assert_eq!(door["host"], "10.0.0.11");
    assert_eq!(door["port"], 502);
    assert_eq!(door["raw_value"], 0);

    // connection and door with attributes, variant, then
    // value/raw/attributes per register
    assert_eq!(messages.len(), 5 + 15 * 3);

    Ok(())
}

#[test]
fn smaller_unit_skips_second_input() -> Result<()> {
    let messages = Message::for_state(&Factory::controller(), state(&Factory::block(&[215, 20000]), true))?;

    assert_eq!(payload(&messages, "boiler/variant"), Some("TimNet 100"));
    assert_eq!(payload(&messages, "boiler/TT2"), None);
    assert_eq!(payload(&messages, "boiler/RELE2/raw"), None);
    assert_eq!(messages.len(), 5 + 12 * 3);

    Ok(())
}

#[test]
fn stale_state_still_publishes_values() -> Result<()> {
    let messages = Message::for_state(&Factory::controller(), state(&Factory::block(&[215, 0, 0, 0, 1]), false))?;

    assert_eq!(payload(&messages, "boiler/connection"), Some("offline"));
    assert_eq!(payload(&messages, "boiler/door"), Some("open"));
    assert_eq!(payload(&messages, "boiler/TT"), Some("21.5"));

    Ok(())
}
