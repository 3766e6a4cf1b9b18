use std::process::ExitCode;

fn main() -> ExitCode {
    match nodereg::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            nodereg::ui::output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
