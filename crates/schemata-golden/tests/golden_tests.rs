//! Conformance and output snapshot tests over the golden corpus
//!
//! Set `RUST_LOG=schemata_core=debug` to see build and resolution traces, and
//! `UPDATE_GOLDEN=1` to rewrite snapshots after an intended output change.

use schemata_golden::{golden_test, golden_test_batch, GoldenConfig, GoldenTestRunner};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Run every suite in the corpus
#[test]
fn golden_test_suite() {
    init_tracing();
    let runner = GoldenTestRunner::new(GoldenConfig::from_env());

    match runner.run_batch("*") {
        Ok(results) => {
            let tests: usize = results.iter().map(|r| r.tests_run).sum();
            println!("All {} golden suites passed ({} tests)", results.len(), tests);
        }
        Err(e) => panic!("Golden tests failed: {}", e),
    }
}

/// Show corpus statistics
#[test]
fn golden_corpus_stats() {
    let runner = GoldenTestRunner::new(GoldenConfig::from_env());
    runner.get_statistics().expect("Failed to get corpus statistics");
}

mod individual_suites {
    use super::*;

    golden_test!(test_type_2020, "draft2020-12/type");
    golden_test!(test_dynamic_ref, "draft2020-12/dynamicRef");
    golden_test!(test_unevaluated_properties, "draft2020-12/unevaluatedProperties");
    golden_test!(test_recursive_ref, "draft2019-09/recursiveRef");
    golden_test!(test_draft7_items, "draft7/items");
    golden_test!(test_person_output, "output/person");

    golden_test_batch!(test_remote_refs, "refRemote");
    golden_test_batch!(test_draft7, "draft7");
}
