//! Command execution.

use colored::Colorize;
use rpclite_client::{Client, ConnectionConfig};
use rpclite_core::{IoTransport, MethodRegistry, Session, SessionConfig};
use rpclite_protocol::hash::method_hash;
use rpclite_protocol::{parse_signature, TypedValue, ValueType, WireMode};
use std::error::Error;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

type CmdResult<T> = Result<T, Box<dyn Error>>;

/// Formats the FNV-1a hash of `name`.
pub fn hash(name: &str) -> String {
    format!("{:016x}", method_hash(name))
}

/// Sends one call and reports its status.
pub fn call(
    server: SocketAddr,
    wire_mode: WireMode,
    method: &str,
    format: &str,
    values: &[String],
) -> CmdResult<String> {
    let args = parse_values(format, values)?;

    let config = ConnectionConfig::new(server)
        .with_session(SessionConfig::new().with_wire_mode(wire_mode));
    let mut client = Client::connect(config, Arc::new(MethodRegistry::new()))?;

    match client.call_fmt(method, format, &args) {
        Ok(()) => Ok(format!(
            "{} {}({}) {}",
            "->".green(),
            method.cyan(),
            format_args_list(&args),
            "OK".green()
        )),
        Err(e) => Err(format!("{} ({})", e, e.code()).into()),
    }
}

/// Serves printing callbacks for each `NAME:SIG` spec, one connection at a time.
pub fn listen(bind: SocketAddr, wire_mode: WireMode, specs: &[String]) -> CmdResult<String> {
    let registry = Arc::new(printing_registry(specs)?);
    let listener = TcpListener::bind(bind)?;
    eprintln!(
        "{} on {} ({}): {}",
        "Listening".green(),
        bind,
        wire_mode,
        registry.names().join(", ").cyan()
    );

    let config = SessionConfig::new().with_wire_mode(wire_mode);
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Accept error: {}", e);
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "?".to_string());
        eprintln!("{} {}", "Connected".green(), peer);

        let mut session = Session::with_config(IoTransport::new(stream), registry.clone(), config);
        loop {
            match session.receive() {
                Ok(_) => {}
                Err(e) if e.is_disconnect() => {
                    eprintln!("{} {}", "Disconnected".dimmed(), peer);
                    break;
                }
                Err(e) => {
                    println!("{} {}", e.code().to_string().red(), e);
                    if e.should_close_connection() {
                        break;
                    }
                }
            }
        }
    }
    Ok(String::new())
}

fn printing_registry(specs: &[String]) -> CmdResult<MethodRegistry> {
    let mut registry = MethodRegistry::new();
    for spec in specs {
        let (name, signature) = parse_method_spec(spec)?;
        let label = name.clone();
        registry.register(name, signature, move |args| {
            println!(
                "{} {}({}) {}",
                "<-".cyan(),
                label,
                format_args_list(args),
                "OK".green()
            );
            Ok(())
        })?;
    }
    Ok(registry)
}

/// Splits a `NAME:SIGNATURE` spec.
pub fn parse_method_spec(spec: &str) -> CmdResult<(String, String)> {
    match spec.rsplit_once(':') {
        Some((name, signature)) if !name.is_empty() => {
            Ok((name.to_string(), signature.to_string()))
        }
        _ => Err(format!("invalid method spec '{}': expected NAME:SIGNATURE", spec).into()),
    }
}

/// Parses command-line values as described by `format`.
pub fn parse_values(format: &str, values: &[String]) -> CmdResult<Vec<TypedValue>> {
    let types = parse_signature(format)?;
    if types.len() != values.len() {
        return Err(format!(
            "format '{}' describes {} values, got {}",
            format,
            types.len(),
            values.len()
        )
        .into());
    }

    types
        .iter()
        .zip(values)
        .map(|(ty, raw)| parse_value(*ty, raw))
        .collect()
}

fn parse_value(ty: ValueType, raw: &str) -> CmdResult<TypedValue> {
    let value = match ty {
        ValueType::Int => TypedValue::Int(
            raw.parse()
                .map_err(|e| format!("invalid int '{}': {}", raw, e))?,
        ),
        ValueType::Float => TypedValue::Float(
            raw.parse()
                .map_err(|e| format!("invalid float '{}': {}", raw, e))?,
        ),
        ValueType::String => TypedValue::string(raw),
        ValueType::Blob => TypedValue::blob(
            hex::decode(raw).map_err(|e| format!("invalid hex blob '{}': {}", raw, e))?,
        ),
        ValueType::List => return Err("list arguments cannot be given on the command line".into()),
    };
    Ok(value)
}

/// Renders a value for display.
pub fn format_value(value: &TypedValue) -> String {
    match value {
        TypedValue::Int(v) => v.to_string(),
        TypedValue::Float(v) => format!("{:?}", v),
        TypedValue::String(b) => format!("{:?}", String::from_utf8_lossy(b)),
        TypedValue::Blob(b) => format!("0x{}", hex::encode(b)),
        TypedValue::List(items) => format!("[{}]", format_args_list(items)),
    }
}

fn format_args_list(values: &[TypedValue]) -> String {
    values.iter().map(format_value).collect::<Vec<_>>().join(", ")
}
