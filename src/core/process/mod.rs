mod executor;

pub use executor::{
    run_checked, run_for_json, ProcessOutcome, ProcessRunner, ProcessSpec, SystemProcessRunner,
};
