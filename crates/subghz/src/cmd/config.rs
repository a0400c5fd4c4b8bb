use crate::cmd::ConfigArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{print_config, ConfigOutput, OutputFormat};

pub fn run(args: ConfigArgs, format: OutputFormat) -> CliResult<i32> {
    let interface = args.port.open()?;

    let result = (|| {
        if let Some(active) = args.active {
            interface.set_active_duration(active)?;
        }
        if let Some(sleep) = args.sleep {
            interface.set_sleep_duration(sleep)?;
        }
        Ok::<_, subghz_link::LinkError>(ConfigOutput {
            port: args.port.port.display().to_string(),
            baud: args.port.baud,
            active_duration: interface.active_duration()?,
            sleep_duration: interface.sleep_duration()?,
        })
    })();
    interface.close();

    let out = result.map_err(|err| link_error("config failed", err))?;
    print_config(&out, format);
    Ok(SUCCESS)
}
