use serde::Serialize;

use crate::cmd::OriginArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_fields, print_json, OutputFormat};

#[derive(Serialize)]
struct OriginOutput<'a> {
    address: &'a str,
    origin: String,
}

pub fn run(args: OriginArgs, format: OutputFormat) -> CliResult<i32> {
    let origin = framelink_transport::get_origin(&args.address)
        .map_err(|err| transport_error("cannot derive origin", &err))?;

    let out = OriginOutput {
        address: &args.address,
        origin,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_fields(&[
            ("address", out.address.to_string()),
            ("origin", out.origin.clone()),
        ]),
        OutputFormat::Pretty => println!("{}", out.origin),
    }
    Ok(SUCCESS)
}
