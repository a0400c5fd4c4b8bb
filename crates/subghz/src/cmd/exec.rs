use crate::cmd::ExecArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{print_responses, OutputFormat};

pub fn run(args: ExecArgs, format: OutputFormat) -> CliResult<i32> {
    let interface = args.port.open()?;
    let command = args.command.trim();

    let responses = interface.exec(command);
    interface.close();
    let responses = responses.map_err(|err| link_error(&format!("{command} failed"), err))?;

    print_responses(command, &responses, format);
    Ok(SUCCESS)
}
