use std::process::ExitCode;

fn main() -> ExitCode {
    ExitCode::from(tablemail::cli::mail_main(std::env::args_os()))
}
