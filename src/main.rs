fn main() {
    match macready::cli::run() {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            macready::ui::eprintln_error(&err);
            std::process::exit(macready::exit::exit_code(&err));
        }
    }
}
