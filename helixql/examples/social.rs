//! # HelixQL Tour (A Tiny Social Graph)
//!
//! Demonstrates the core workflow:
//! 1. Opening a database from a schema + query source.
//! 2. Inserting nodes and edges.
//! 3. Running declared and ad-hoc queries.
//! 4. Consuming results as rows, as JSON, and through a cursor.
//!
//! Run with `cargo run --example social`. Set `RUST_LOG=debug` to watch
//! the store and the compiler at work.

use helixql::{Database, Params, Result, Value, props};

const SOURCE: &str = "
NODE User {
    Username: String,
    FollowerCount: Int,
    Status: { Active, Banned },
}

EDGE Follows FROM User TO User {
    Since: Int,
}

QUERY activeUsers() =>
    users <- GET User
    WHERE Status::Active
    RETURN Username, FollowerCount

QUERY followed(userID: String) =>
    GET User(userID)::Out::Follows DISTINCT
    RETURN Username
";

fn main() -> Result<()> {
    env_logger::init();
    println!("🧭 HelixQL tour: a tiny social graph");

    // 1. Open: the schema and the named queries compile together
    let mut db = Database::open(SOURCE)?;

    // 2. Write data, validated against the schema
    let active = db.tag("User", "Status", "Active")?;
    let banned = db.tag("User", "Status", "Banned")?;

    let ada = db.insert_node(
        "User",
        props! {
            "Username" => "ada",
            "FollowerCount" => 2,
            "Status" => active.clone(),
        },
    )?;
    let brendan = db.insert_node(
        "User",
        props! {
            "Username" => "brendan",
            "FollowerCount" => 1,
            "Status" => active,
        },
    )?;
    let crawler = db.insert_node(
        "User",
        props! {
            "Username" => "crawler",
            "FollowerCount" => 0,
            "Status" => banned,
        },
    )?;

    db.insert_edge("Follows", brendan.id, ada.id, props! { "Since" => 2021 })?;
    db.insert_edge("Follows", crawler.id, ada.id, props! { "Since" => 2024 })?;
    db.insert_edge("Follows", ada.id, brendan.id, props! { "Since" => 2022 })?;
    println!("📝 Inserted 3 users and 3 follows");

    // 3. A declared query
    println!("\n🔍 activeUsers:");
    let outcome = db.run("activeUsers", &Params::new())?;
    if let Some(rows) = outcome.as_rows() {
        for row in rows {
            println!(
                "  {:?} ({:?} followers)",
                row.value("Username"),
                row.value("FollowerCount")
            );
        }
    }

    // 4. A declared query with a parameter
    println!("\n🔍 followed(ada):");
    let mut params = Params::new();
    params.insert("userID".to_string(), Value::from(ada.id.to_string()));
    let outcome = db.run("followed", &params)?;
    if let Some(rows) = outcome.as_rows() {
        for row in rows {
            println!("  {:?}", row.value("Username"));
        }
    }

    // 5. An ad-hoc query, rendered as JSON
    let outcome = db.query(
        "GET User WHERE Status::Banned RETURN Username JSON",
        &Params::new(),
    )?;
    if let Some(json) = outcome.as_json() {
        println!("\n🧾 Banned users as JSON: {json}");
    }

    // 6. The same data, one row at a time
    let outcome = db.query("GET User RETURN Username NEXT", &Params::new())?;
    if let Some(mut cursor) = outcome.into_cursor() {
        println!("\n🎛  Cursor:");
        while let Some(row) = cursor.next()? {
            println!("  {:?}", row.value("Username"));
        }
    }

    println!("\n✨ Tour complete");
    Ok(())
}
