use std::any::Any;
use std::panic;
use std::process::ExitCode;

use cmdbuilder::console::entrypoint::run;

/// Whether a panic came from writing to a closed stdout.
fn is_broken_pipe(payload: &(dyn Any + Send)) -> bool {
    let message = match payload.downcast_ref::<&str>() {
        Some(message) => *message,
        None => match payload.downcast_ref::<String>() {
            Some(message) => message.as_str(),
            None => return false,
        },
    };
    message.contains("Broken pipe")
}

fn main() -> anyhow::Result<ExitCode> {
    // `cmdb --complete ... | head` closes stdout early.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if is_broken_pipe(info.payload()) {
            std::process::exit(0);
        }
        default_hook(info);
    }));
    run()
}
