//! beancheck - summarize a ledger as four lines of JSON.

fn main() -> std::process::ExitCode {
    beancheck::cmd::check::main()
}
