//! A stdio tool-server fixture that exits immediately without responding,
//! for exercising [`EngineError::InitFailed`]/[`EngineError::Timeout`] in
//! supervisor startup tests.

fn main() {
    std::process::exit(1);
}
