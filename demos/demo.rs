//! Demo of the codec over the in-memory engine
//!
//! This program shows how to:
//! - Build a codec and a typed store
//! - Store JSON documents under ordered two-component keys
//! - Scan records back in key order
//! - Batch writes and look at the raw encodings

use anyhow::{Context, Result};
use levelcodec::value::json::{from_json_str, to_json_string};
use levelcodec::{Codec, KeyLayout, KeyPart, MemEngine, Options, Store, Value, WriteBatch};
use std::sync::Arc;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    let codec = Arc::new(Codec::new(Options::default()).context("building codec")?);
    let store = Store::new(Arc::clone(&codec), KeyLayout::StrN64, MemEngine::new());

    // Write some documents
    println!("=== Writing Data ===");
    for (user, seq, doc) in [
        ("ada", 2, r#"{"event": "login", "ok": true}"#),
        ("ada", -1, r#"{"event": "signup", "plan": "free"}"#),
        ("bob", 7, r#"{"event": "purchase", "items": [1, 2, 3], "total": 19.5}"#),
        ("ada", 10, r#"{"event": "logout"}"#),
    ] {
        let value = from_json_str(doc).with_context(|| format!("parsing {}", doc))?;
        store.put(&user.into(), &KeyPart::I64(seq), &value)?;
        println!("Put: ({}, {}) -> {}", user, seq, doc);
    }

    // Scan one user in sequence order
    println!("\n=== Scanning ada ===");
    for record in store.scan_prefix(&"ada".into())? {
        println!("{:?} -> {}", record.second, to_json_string(&record.value)?);
    }

    // Batch a few changes
    println!("\n=== Batch Write ===");
    let mut batch = WriteBatch::new();
    store.batch_remove(&mut batch, &"ada".into(), &KeyPart::I64(10))?;
    store.batch_put(&mut batch, &"carol".into(), &KeyPart::I64(1), &Value::from("hello"))?;
    println!("Applying {} operations ({} bytes)", batch.len(), batch.approximate_size());
    store.apply(batch)?;

    for record in store.entries()? {
        println!("({:?}, {:?}) -> {}", record.first, record.second, to_json_string(&record.value)?);
    }

    // Raw encodings
    println!("\n=== Encodings ===");
    let mut pool = codec.pool();
    let key = codec.key_buffer(&mut pool, KeyLayout::N64Str, &KeyPart::I64(-42), &"café".into())?;
    println!("key (-42, \"café\"): {:02x?}", key.as_slice());
    let value = codec.value_buffer(&mut pool, &Value::I32(300))?;
    println!("value 300i32:      {:02x?}", value.as_slice());

    let stats = codec.pool_cache().stats();
    println!("\nPool cache: {} hits, {} misses", stats.hits, stats.misses);

    Ok(())
}
