#![no_main]

use libfuzzer_sys::fuzz_target;
use localdb_fixture::ConnectionString;

fuzz_target!(|input: (&str, &str)| {
    let (raw, database) = input;
    // Fuzz connection string parsing and database retargeting
    if let Ok(cs) = ConnectionString::custom(raw) {
        let target = cs.for_database(database);
        let _ = target.to_string().parse::<ConnectionString>();
        let _ = cs.for_database("master").attach_db_filename();
    }
});
