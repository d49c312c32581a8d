use std::sync::atomic::{AtomicU64, Ordering};

use indoc::indoc;
use seedling::Describe;
use seedling::json::from_str;

static NEXT_ID: AtomicU64 = AtomicU64::new(100);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

#[derive(Describe, Debug, PartialEq)]
struct Item {
    name: String,
    #[seedling(default = next_id())]
    id: u64,
}

#[derive(Describe, Debug, PartialEq)]
struct Order {
    items: Vec<Item>,
    note: Option<String>,
}

#[test]
fn defaults_are_evaluated_once_per_missing_field() -> eyre::Result<()> {
    seedling_testhelpers::setup();

    let order: Order = from_str(indoc! {r#"
        {
          "items": [
            {"name": "a"},
            {"name": "b", "id": 9},
            {"name": "c"}
          ]
        }
    "#})?;

    assert_eq!(NEXT_ID.load(Ordering::SeqCst), 102);
    assert_eq!(
        order,
        Order {
            items: vec![
                Item {
                    name: "a".into(),
                    id: 100
                },
                Item {
                    name: "b".into(),
                    id: 9
                },
                Item {
                    name: "c".into(),
                    id: 101
                },
            ],
            note: None,
        }
    );
    Ok(())
}

#[test]
fn a_failed_item_fails_the_whole_document() {
    seedling_testhelpers::setup();

    let err = from_str::<Order>(r#"{"items": [{"name": "a", "id": 1}, {"id": 2}]}"#).unwrap_err();
    insta::assert_snapshot!(err, @"missing field `name` in type `Item` at $.items[1] (bytes 43..44)");
}
