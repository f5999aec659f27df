//! XML-RPC request encoding and response decoding.

use crate::error::{RpcError, RpcResult};
use crate::value::Value;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;

/// Encode a `<methodCall>` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn encode_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            if i32::try_from(*i).is_ok() {
                out.push_str(&format!("<int>{}</int>", i));
            } else {
                out.push_str(&format!("<i8>{}</i8>", i));
            }
        }
        Value::Bool(b) => out.push_str(if *b {
            "<boolean>1</boolean>"
        } else {
            "<boolean>0</boolean>"
        }),
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Double(d) => out.push_str(&format!("<double>{}</double>", d)),
        Value::DateTime(dt) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&escape(dt.as_str()));
            out.push_str("</dateTime.iso8601>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                encode_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

/// Decode a `<methodResponse>` document.
///
/// A `<fault>` response is returned as [`RpcError::Fault`].
pub fn decode_response(xml: &str) -> RpcResult<Value> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(RpcError::protocol(format!(
            "expected methodResponse, got <{}>",
            root.name
        )));
    }

    if let Some(fault) = root.child("fault") {
        let value = decode_value(required(fault, "value")?)?;
        let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(RpcError::Fault { code, message });
    }

    let params = required(&root, "params")?;
    match params.child("param") {
        Some(param) => decode_value(required(param, "value")?),
        // A void method answers with empty params.
        None => Ok(Value::Nil),
    }
}

fn decode_value(node: &Node) -> RpcResult<Value> {
    let typed = match node.children.first() {
        Some(child) => child,
        None => return Ok(Value::String(node.text.clone())),
    };

    let text = typed.text.trim();
    match typed.name.as_str() {
        "int" | "i4" | "i8" => text
            .parse()
            .map(Value::Int)
            .map_err(|_| RpcError::protocol(format!("invalid integer '{}'", text))),
        "boolean" => match text {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(RpcError::protocol(format!("invalid boolean '{}'", other))),
        },
        "string" => Ok(Value::String(typed.text.clone())),
        "double" => text
            .parse()
            .map(Value::Double)
            .map_err(|_| RpcError::protocol(format!("invalid double '{}'", text))),
        "dateTime.iso8601" => Ok(Value::DateTime(text.to_string())),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map(Value::Base64)
                .map_err(|e| RpcError::protocol(format!("invalid base64: {}", e)))
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.elements("member") {
                let name = required(member, "name")?.text.clone();
                let value = decode_value(required(member, "value")?)?;
                members.insert(name, value);
            }
            Ok(Value::Struct(members))
        }
        "array" => {
            let data = required(typed, "data")?;
            data.elements("value")
                .map(decode_value)
                .collect::<RpcResult<Vec<_>>>()
                .map(Value::Array)
        }
        "nil" => Ok(Value::Nil),
        other => Err(RpcError::protocol(format!("unknown value type <{}>", other))),
    }
}

/// Element tree built from the response before interpretation.
#[derive(Debug, Default)]
struct Node {
    name: String,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn required<'a>(node: &'a Node, name: &str) -> RpcResult<&'a Node> {
    node.child(name).ok_or_else(|| {
        RpcError::protocol(format!("<{}> without <{}> element", node.name, name))
    })
}

fn parse_tree(xml: &str) -> RpcResult<Node> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(Node::new(name));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                attach(&mut stack, &mut root, Node::new(name))?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| RpcError::protocol("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| RpcError::protocol(format!("invalid text: {}", e)))?;
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(RpcError::protocol(format!(
                    "invalid XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !stack.is_empty() {
        return Err(RpcError::protocol("unexpected end of document"));
    }
    root.ok_or_else(|| RpcError::protocol("empty response body"))
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> RpcResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    } else {
        return Err(RpcError::protocol("multiple root elements"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_call() {
        let xml = encode_call(
            "system.setChildChannels",
            &[
                Value::from("key"),
                Value::from(1000010000i64),
                Value::Array(vec![Value::from("sp-2024-01-15.rhel7-updates")]),
            ],
        );
        assert!(xml.starts_with("<?xml version=\"1.0\"?>\n<methodCall>"));
        assert!(xml.contains("<methodName>system.setChildChannels</methodName>"));
        assert!(xml.contains("<value><int>1000010000</int></value>"));
        assert!(xml.contains(
            "<array><data><value><string>sp-2024-01-15.rhel7-updates</string></value></data></array>"
        ));
    }

    #[test]
    fn test_encode_escapes_and_wide_ints() {
        let xml = encode_call(
            "auth.login",
            &[Value::from("a<b&c"), Value::from(i64::from(i32::MAX) + 1)],
        );
        assert!(xml.contains("<string>a&lt;b&amp;c</string>"));
        assert!(xml.contains("<i8>2147483648</i8>"));
    }

    #[test]
    fn test_encode_struct() {
        let xml = encode_call(
            "channel.software.clone",
            &[Value::structure([
                ("label", Value::from("x")),
                ("parent_label", Value::from("y")),
            ])],
        );
        assert!(xml.contains(
            "<struct><member><name>label</name><value><string>x</string></value></member>\
<member><name>parent_label</name><value><string>y</string></value></member></struct>"
        ));
    }

    #[test]
    fn test_decode_string_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<methodResponse>
  <params>
    <param><value><string>5a8c2f0e</string></value></param>
  </params>
</methodResponse>"#;
        assert_eq!(decode_response(xml).unwrap(), Value::from("5a8c2f0e"));
    }

    #[test]
    fn test_decode_untyped_string() {
        let xml = "<methodResponse><params><param><value>15</value></param></params></methodResponse>";
        assert_eq!(decode_response(xml).unwrap(), Value::from("15"));

        let xml = "<methodResponse><params><param><value/></param></params></methodResponse>";
        assert_eq!(decode_response(xml).unwrap(), Value::from(""));
    }

    #[test]
    fn test_decode_array_of_structs() {
        let xml = r#"<methodResponse><params><param><value><array><data>
  <value><struct>
    <member><name>id</name><value><i4>1000010000</i4></value></member>
    <member><name>name</name><value><string>web01.example.com</string></value></member>
    <member><name>last_checkin</name><value><dateTime.iso8601>20240115T10:00:00</dateTime.iso8601></value></member>
  </struct></value>
  <value><struct>
    <member><name>id</name><value><int>1000010001</int></value></member>
    <member><name>name</name><value>web02.example.com</value></member>
  </struct></value>
</data></array></value></param></params></methodResponse>"#;

        let value = decode_response(xml).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].member_i64("id").unwrap(), 1000010000);
        assert_eq!(items[1].member_str("name").unwrap(), "web02.example.com");
        assert_eq!(
            items[0].get("last_checkin"),
            Some(&Value::DateTime("20240115T10:00:00".to_string()))
        );
    }

    #[test]
    fn test_decode_empty_struct() {
        let xml = "<methodResponse><params><param><value><struct></struct></value></param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            Value::Struct(BTreeMap::new())
        );
    }

    #[test]
    fn test_decode_scalars() {
        let wrap = |inner: &str| {
            format!(
                "<methodResponse><params><param><value>{}</value></param></params></methodResponse>",
                inner
            )
        };
        assert_eq!(
            decode_response(&wrap("<boolean>1</boolean>")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            decode_response(&wrap("<double>1.5</double>")).unwrap(),
            Value::Double(1.5)
        );
        assert_eq!(
            decode_response(&wrap("<base64>aGVsbG8=</base64>")).unwrap(),
            Value::Base64(b"hello".to_vec())
        );
        assert_eq!(decode_response(&wrap("<nil/>")).unwrap(), Value::Nil);
        assert_eq!(
            decode_response(&wrap("<string>a &amp; b</string>")).unwrap(),
            Value::from("a & b")
        );
    }

    #[test]
    fn test_decode_fault() {
        let xml = r#"<?xml version="1.0"?>
<methodResponse><fault><value><struct>
  <member><name>faultCode</name><value><int>-210</int></value></member>
  <member><name>faultString</name><value><string>redstone.xmlrpc.XmlRpcFault: Invalid channel</string></value></member>
</struct></value></fault></methodResponse>"#;

        assert_eq!(
            decode_response(xml).unwrap_err(),
            RpcError::fault(-210, "redstone.xmlrpc.XmlRpcFault: Invalid channel")
        );
    }

    #[test]
    fn test_decode_void_response() {
        let xml = "<methodResponse><params></params></methodResponse>";
        assert_eq!(decode_response(xml).unwrap(), Value::Nil);
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode_response("<html><body>502 Bad Gateway</body></html>"),
            Err(RpcError::Protocol(_))
        ));
        assert!(matches!(
            decode_response("<methodResponse><params>"),
            Err(RpcError::Protocol(_))
        ));
        assert!(matches!(decode_response(""), Err(RpcError::Protocol(_))));
        assert!(matches!(
            decode_response(
                "<methodResponse><params><param><value><int>abc</int></value></param></params></methodResponse>"
            ),
            Err(RpcError::Protocol(_))
        ));
    }
}
