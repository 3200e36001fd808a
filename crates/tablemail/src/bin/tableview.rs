use std::process::ExitCode;

fn main() -> ExitCode {
    ExitCode::from(tablemail::cli::view_main(std::env::args_os()))
}
