use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pathwire::transport::{LineTransport, RemoteError, Request, Response, Transport};
use pathwire::{Client, ClientConfig, PathwireError, Value, dump};
use serde_json::json;

/// Serves one connection, answering each request with `answer`.
fn serve<F>(answer: F) -> Result<(String, JoinHandle<Vec<Request>>), std::io::Error>
where
    F: Fn(&Request) -> Response + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?.to_string();
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        let Ok((stream, _)) = listener.accept() else {
            return seen;
        };
        let Ok(mut writer) = stream.try_clone() else {
            return seen;
        };
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            let Ok(request) = serde_json::from_str::<Request>(&line) else {
                break;
            };
            let Ok(mut reply) = serde_json::to_string(&answer(&request)) else {
                break;
            };
            reply.push('\n');
            if writer.write_all(reply.as_bytes()).is_err() {
                break;
            }
            seen.push(request);
        }
        seen
    });
    Ok((address, handle))
}

#[test]
fn request_reply_over_tcp() -> Result<(), Box<dyn std::error::Error>> {
    let reply = serde_json::to_value(dump(&42)?)?;
    let (address, server) = serve(move |req| Response::success(&req.id, Some(reply.clone())))?;

    let mut transport = LineTransport::new(address);
    transport.connect()?;
    transport.connect()?;
    assert!(transport.is_connected());

    let result = transport.call("get_value", json!("answer"))?;
    assert_eq!(result.and_then(|r| r.get("value").cloned()), Some(json!(42)));

    transport.disconnect()?;
    assert!(!transport.is_connected());

    let seen = server.join().map_err(|_| "server panicked")?;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "get_value");
    assert_eq!(seen[0].params, json!("answer"));
    Ok(())
}

#[test]
fn client_over_tcp() -> Result<(), Box<dyn std::error::Error>> {
    let (address, server) = serve(|req| match req.method.as_str() {
        "get_value" => {
            let node = dump(&vec![1, 2]).and_then(|n| Ok(serde_json::to_value(n)?));
            Response::success(&req.id, node.ok())
        }
        _ => Response::success(&req.id, None),
    })?;

    let config = ClientConfig::new(format!("tcp://{}", address));
    {
        let mut client = Client::connect(&config)?;
        assert_eq!(
            client.get_value("list_attr")?,
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(client.set_value("list_attr[0]", &5)?, Value::None);
    }

    let seen = server.join().map_err(|_| "server panicked")?;
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].method, "update_value");
    assert_eq!(seen[1].params["access_path"], "list_attr[0]");
    assert_eq!(seen[1].params["value"]["value"], 5);
    Ok(())
}

#[test]
fn remote_error_is_surfaced() -> Result<(), Box<dyn std::error::Error>> {
    let (address, _server) = serve(|req| {
        Response::error(
            &req.id,
            RemoteError {
                code: "AttributeError".into(),
                message: "no attribute 'nope'".into(),
            },
        )
    })?;

    let mut transport = LineTransport::new(address);
    transport.connect()?;
    let err = transport.call("get_value", json!("nope"));
    assert!(matches!(
        err,
        Err(PathwireError::Remote { ref code, .. }) if code == "AttributeError"
    ));
    Ok(())
}

#[test]
fn mismatched_response_id_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (address, _server) = serve(|_| Response::success("someone-else", None))?;

    let mut transport = LineTransport::new(address);
    transport.connect()?;
    assert!(matches!(
        transport.call("get_value", json!("x")),
        Err(PathwireError::Transport(_))
    ));
    assert!(!transport.is_connected());
    Ok(())
}

/// Answers the request on one connection after `delay`.
fn answer_after(stream: TcpStream, delay: Duration) {
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    if reader.read_line(&mut line).is_err() {
        return;
    }
    let Ok(request) = serde_json::from_str::<Request>(&line) else {
        return;
    };
    thread::sleep(delay);
    let Ok(mut reply) = serde_json::to_string(&Response::success(&request.id, Some(json!(1))))
    else {
        return;
    };
    reply.push('\n');
    let _ = writer.write_all(reply.as_bytes());
}

#[test]
fn timed_out_request_drops_the_connection() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?.to_string();
    let server = thread::spawn(move || {
        for delay in [Duration::from_millis(300), Duration::ZERO] {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            thread::spawn(move || answer_after(stream, delay));
        }
    });

    let config = ClientConfig {
        request_timeout_ms: Some(100),
        ..ClientConfig::new(address)
    };
    let mut transport = LineTransport::from_config(&config);
    transport.connect()?;

    assert!(matches!(
        transport.call("get_value", json!("slow")),
        Err(PathwireError::Transport(_))
    ));
    assert!(!transport.is_connected());
    assert!(matches!(
        transport.call("get_value", json!("slow")),
        Err(PathwireError::NotConnected)
    ));

    // The late reply went to the abandoned connection.
    transport.connect()?;
    assert_eq!(transport.call("get_value", json!("fast"))?, Some(json!(1)));

    server.join().map_err(|_| "server panicked")?;
    Ok(())
}

#[test]
fn connecting_to_closed_port_fails() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let address = listener.local_addr()?.to_string();
    drop(listener);

    let mut transport = LineTransport::new(address);
    assert!(matches!(transport.connect(), Err(PathwireError::Transport(_))));
    assert!(!transport.is_connected());
    Ok(())
}
