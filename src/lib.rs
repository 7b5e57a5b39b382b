/*!
# `jmesquery` Library

Compile and evaluate JMESPath expressions against in-memory JSON documents.

```rust
use jmesquery::search;
use serde_json::json;

let doc = json!({"locations": [
    {"name": "Seattle", "state": "WA"},
    {"name": "Portland", "state": "OR"},
]});
let names = search(&doc, "locations[?state == 'WA'].name").unwrap();
assert_eq!(names, json!(["Seattle"]));
```
*/

pub mod query;
pub mod utils;

pub use query::{Expression, QueryError, compile, search};
