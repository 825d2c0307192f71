#![no_main]

use libfuzzer_sys::fuzz_target;
use sqlcmd_script::{SchemaScript, clear_tables_script};

fuzz_target!(|data: &[u8]| {
    // Fuzz script normalization, batch splitting and table extraction
    if let Ok(s) = std::str::from_utf8(data) {
        let script = SchemaScript::new(s);
        let _ = script.fingerprint();
        for unit in script.command_units() {
            assert!(!unit.sql().trim().is_empty());
        }
        let _ = clear_tables_script(script.created_tables());
        let _ = script.with_database_name("fuzz");
    }
});
