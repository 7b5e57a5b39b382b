//! An example of compiling a JMESPath expression once and evaluating it
//! against several documents, plus the one-shot [`search`] helper.
use jmesquery::query::{Expression, search};
use serde_json::json;

fn main() {
    // One-shot evaluation: filter then project.
    let doc = json!({"locations": [
        {"name": "Seattle", "state": "WA"},
        {"name": "Portland", "state": "OR"},
        {"name": "Olympia", "state": "WA"},
    ]});
    let names = search(&doc, "locations[?state == 'WA'].name")
        .expect("valid expression");
    assert_eq!(names, json!(["Seattle", "Olympia"]));

    // Compile once, evaluate many times.
    let expr: Expression =
        "sort_by(readings, &celsius) | [0]".parse().expect("valid expression");
    for (readings, coldest) in [
        (json!({"readings": [{"celsius": 9}, {"celsius": 3}]}), 3),
        (json!({"readings": [{"celsius": -4}, {"celsius": 18}]}), -4),
    ] {
        let result = expr.search(&readings).expect("evaluation succeeds");
        assert_eq!(result["celsius"], json!(coldest));
    }

    println!("coldest reading query: {expr}");
}
