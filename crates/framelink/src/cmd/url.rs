use framelink_session::{checkout_address, PublicOptions, Ui};
use serde::Serialize;

use crate::cmd::UrlArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_fields, print_json, OutputFormat};

#[derive(Serialize)]
struct UrlOutput {
    address: String,
    origin: String,
    query: String,
    fragment: Option<PublicOptions>,
}

pub fn run(args: UrlArgs, format: OutputFormat) -> CliResult<i32> {
    let options = args.options.resolve()?.with_default_ui(Ui::Fullscreen);
    let address = checkout_address(&options, args.token.as_deref());
    let origin = framelink_transport::get_origin(&address)
        .map_err(|err| transport_error("checkout address has no origin", &err))?;

    let fragment = address
        .split_once('#')
        .and_then(|(_, encoded)| PublicOptions::from_fragment(encoded));
    let out = UrlOutput {
        origin,
        query: options.routing_options().to_query(),
        fragment,
        address,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let fragment = match &out.fragment {
                Some(public) => serde_json::to_string(public).unwrap_or_default(),
                None => "-".to_string(),
            };
            print_fields(&[
                ("address", out.address.clone()),
                ("origin", out.origin.clone()),
                ("query", out.query.clone()),
                ("fragment", fragment),
            ]);
        }
        OutputFormat::Pretty => println!("{}", out.address),
    }
    Ok(SUCCESS)
}
