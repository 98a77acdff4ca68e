pub mod harness;

#[allow(unused_imports)]
pub use harness::{read_json, ProdqlTestHarness, StubExecutor, API_KEY};
