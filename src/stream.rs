//! Tagwire Streaming Element Protocol
//! Pull-reader and push-writer abstractions over a message as a flat
//! sequence of elements, plus the adapters between elements and the
//! in-memory container model.

use crate::error::{WireError, WireResult};
use crate::message::{Field, Message};
use crate::value::Value;

/// One discrete element of a message stream. End of stream is expressed as
/// `None` from [`ElementReader::next_element`], not as a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// The opening of a top-level message.
    MessageStart,
    /// A simple (non-message) field.
    Field(Field),
    /// The opening of a nested sub-message field. Its fields follow before
    /// the matching [`Element::SubmessageEnd`]; nesting is strictly
    /// stack-shaped.
    SubmessageStart {
        name: Option<String>,
        ordinal: Option<i16>,
    },
    SubmessageEnd,
    /// The end of the top-level message.
    MessageEnd,
}

/// A pull cursor over a stream of elements.
pub trait ElementReader {
    /// Whether another element is available. Safe to call repeatedly
    /// without consuming anything.
    fn has_next(&mut self) -> WireResult<bool>;

    /// Advance exactly one element; `None` once the stream is exhausted.
    fn next_element(&mut self) -> WireResult<Option<Element>>;
}

/// The push dual of [`ElementReader`]. Unbalanced start/end calls are usage
/// errors, reported at the violating call.
pub trait ElementWriter {
    fn start_message(&mut self) -> WireResult<()>;

    fn start_submessage(&mut self, name: Option<&str>, ordinal: Option<i16>) -> WireResult<()>;

    /// Write one simple field. Fields holding sub-message values must go
    /// through `start_submessage`/`end_submessage` instead; passing one
    /// here is a usage error.
    fn write_field(&mut self, field: &Field) -> WireResult<()>;

    /// Bulk variant of `write_field`.
    fn write_fields(&mut self, fields: &[Field]) -> WireResult<()> {
        for field in fields {
            self.write_field(field)?;
        }
        Ok(())
    }

    fn end_submessage(&mut self) -> WireResult<()>;

    fn end_message(&mut self) -> WireResult<()>;

    fn flush(&mut self) -> WireResult<()> {
        Ok(())
    }

    /// Signal that no further elements will be written. Defaults to a
    /// flush; writers that hand back an owned result, like the binary
    /// encoder's `into_bytes`, finish through that instead.
    fn close(&mut self) -> WireResult<()> {
        self.flush()
    }
}

/// Fans one element sequence out to several writers unchanged, for
/// simultaneous encodings. Purely structural; no decision logic.
#[derive(Default)]
pub struct MultiWriter {
    writers: Vec<Box<dyn ElementWriter>>,
}

impl MultiWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, writer: Box<dyn ElementWriter>) -> &mut Self {
        self.writers.push(writer);
        self
    }

    pub fn into_writers(self) -> Vec<Box<dyn ElementWriter>> {
        self.writers
    }
}

impl ElementWriter for MultiWriter {
    fn start_message(&mut self) -> WireResult<()> {
        for w in &mut self.writers {
            w.start_message()?;
        }
        Ok(())
    }

    fn start_submessage(&mut self, name: Option<&str>, ordinal: Option<i16>) -> WireResult<()> {
        for w in &mut self.writers {
            w.start_submessage(name, ordinal)?;
        }
        Ok(())
    }

    fn write_field(&mut self, field: &Field) -> WireResult<()> {
        for w in &mut self.writers {
            w.write_field(field)?;
        }
        Ok(())
    }

    fn end_submessage(&mut self) -> WireResult<()> {
        for w in &mut self.writers {
            w.end_submessage()?;
        }
        Ok(())
    }

    fn end_message(&mut self) -> WireResult<()> {
        for w in &mut self.writers {
            w.end_message()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> WireResult<()> {
        for w in &mut self.writers {
            w.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> WireResult<()> {
        for w in &mut self.writers {
            w.close()?;
        }
        Ok(())
    }
}

/// Push a message tree through a writer as a full element sequence.
/// Recursion depth equals the depth of the already-built tree.
pub fn write_message(message: &Message, writer: &mut dyn ElementWriter) -> WireResult<()> {
    writer.start_message()?;
    write_fields_of(message, writer)?;
    writer.end_message()
}

fn write_fields_of(message: &Message, writer: &mut dyn ElementWriter) -> WireResult<()> {
    for field in message {
        match field.value() {
            Value::Message(sub) => {
                writer.start_submessage(field.name(), field.ordinal())?;
                write_fields_of(sub, writer)?;
                writer.end_submessage()?;
            }
            _ => writer.write_field(field)?,
        }
    }
    Ok(())
}

/// Rebuilds a message tree from an element sequence via an explicit stack
/// of currently-open containers. The reference adapter between the element
/// protocol and the container model; also the strict-nesting enforcer.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    /// Open containers, innermost last; entry 0 is the top-level message.
    stack: Vec<(Option<String>, Option<i16>, Message)>,
    finished: Option<Message>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one element.
    pub fn apply(&mut self, element: Element) -> WireResult<()> {
        match element {
            Element::MessageStart => {
                if !self.stack.is_empty() || self.finished.is_some() {
                    return Err(WireError::invalid("message already started"));
                }
                self.stack.push((None, None, Message::new()));
            }
            Element::Field(field) => {
                let Some((_, _, open)) = self.stack.last_mut() else {
                    return Err(WireError::invalid("field outside a message"));
                };
                open.add_field(field);
            }
            Element::SubmessageStart { name, ordinal } => {
                if self.stack.is_empty() {
                    return Err(WireError::invalid("sub-message outside a message"));
                }
                self.stack.push((name, ordinal, Message::new()));
            }
            Element::SubmessageEnd => {
                if self.stack.len() < 2 {
                    return Err(WireError::invalid("no open sub-message to end"));
                }
                let (name, ordinal, sub) = self.stack.pop().expect("checked depth");
                let (_, _, parent) = self.stack.last_mut().expect("checked depth");
                parent.add_field(Field::new(name, ordinal, Value::Message(sub)));
            }
            Element::MessageEnd => {
                if self.stack.len() != 1 {
                    return Err(WireError::invalid(
                        "message ended while sub-messages remain open",
                    ));
                }
                let (_, _, message) = self.stack.pop().expect("checked depth");
                self.finished = Some(message);
            }
        }
        Ok(())
    }

    /// The completed message, once `MessageEnd` has been applied.
    pub fn finish(self) -> WireResult<Message> {
        self.finished
            .ok_or_else(|| WireError::invalid("message not finished"))
    }
}

impl ElementWriter for MessageBuilder {
    fn start_message(&mut self) -> WireResult<()> {
        self.apply(Element::MessageStart)
    }

    fn start_submessage(&mut self, name: Option<&str>, ordinal: Option<i16>) -> WireResult<()> {
        self.apply(Element::SubmessageStart {
            name: name.map(str::to_string),
            ordinal,
        })
    }

    fn write_field(&mut self, field: &Field) -> WireResult<()> {
        if matches!(field.value(), Value::Message(_)) {
            return Err(WireError::invalid(
                "sub-message values must be written through start_submessage",
            ));
        }
        self.apply(Element::Field(field.clone()))
    }

    fn end_submessage(&mut self) -> WireResult<()> {
        self.apply(Element::SubmessageEnd)
    }

    fn end_message(&mut self) -> WireResult<()> {
        self.apply(Element::MessageEnd)
    }
}

/// Drain a reader into a rebuilt message, or `None` if the stream holds no
/// further message.
pub fn build_message(reader: &mut dyn ElementReader) -> WireResult<Option<Message>> {
    if !reader.has_next()? {
        return Ok(None);
    }
    let mut builder = MessageBuilder::new();
    while let Some(element) = reader.next_element()? {
        let done = element == Element::MessageEnd;
        builder.apply(element)?;
        if done {
            break;
        }
    }
    builder.finish().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        let mut address = Message::new();
        address.add("line1", "29 Acacia Road");
        address.add("city", "London");

        let mut msg = Message::new();
        msg.add("name", "Fred");
        msg.add("age", 14i32);
        msg.add("address", address);
        msg
    }

    #[test]
    fn test_tree_round_trip() {
        let original = sample_message();
        let mut builder = MessageBuilder::new();
        write_message(&original, &mut builder).unwrap();
        assert_eq!(builder.finish().unwrap(), original);
    }

    #[test]
    fn test_nesting_depth() {
        let mut msg = Message::new();
        msg.add("leaf", 1i32);
        for _ in 0..64 {
            let mut outer = Message::new();
            outer.add("inner", msg);
            msg = outer;
        }

        let mut builder = MessageBuilder::new();
        write_message(&msg, &mut builder).unwrap();
        assert_eq!(builder.finish().unwrap(), msg);
    }

    #[test]
    fn test_unbalanced_end_is_usage_error() {
        let mut builder = MessageBuilder::new();
        builder.start_message().unwrap();
        assert!(builder.end_submessage().is_err());

        let mut builder = MessageBuilder::new();
        builder.start_message().unwrap();
        builder.start_submessage(Some("open"), None).unwrap();
        assert!(builder.end_message().is_err());
    }

    #[test]
    fn test_submessage_value_rejected_as_simple_field() {
        let mut builder = MessageBuilder::new();
        builder.start_message().unwrap();
        let field = Field::new(Some("sub".into()), None, Message::new());
        assert!(matches!(
            builder.write_field(&field),
            Err(WireError::InvalidState(_))
        ));
    }

    #[test]
    fn test_multi_writer_fans_out() {
        use std::cell::RefCell;
        use std::rc::Rc;

        #[derive(Default)]
        struct Recorder(Rc<RefCell<Vec<Element>>>);

        impl ElementWriter for Recorder {
            fn start_message(&mut self) -> WireResult<()> {
                self.0.borrow_mut().push(Element::MessageStart);
                Ok(())
            }
            fn start_submessage(
                &mut self,
                name: Option<&str>,
                ordinal: Option<i16>,
            ) -> WireResult<()> {
                self.0.borrow_mut().push(Element::SubmessageStart {
                    name: name.map(str::to_string),
                    ordinal,
                });
                Ok(())
            }
            fn write_field(&mut self, field: &Field) -> WireResult<()> {
                self.0.borrow_mut().push(Element::Field(field.clone()));
                Ok(())
            }
            fn end_submessage(&mut self) -> WireResult<()> {
                self.0.borrow_mut().push(Element::SubmessageEnd);
                Ok(())
            }
            fn end_message(&mut self) -> WireResult<()> {
                self.0.borrow_mut().push(Element::MessageEnd);
                Ok(())
            }
        }

        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));
        let mut multi = MultiWriter::new();
        multi.push(Box::new(Recorder(Rc::clone(&first))));
        multi.push(Box::new(Recorder(Rc::clone(&second))));

        write_message(&sample_message(), &mut multi).unwrap();
        multi.close().unwrap();

        assert_eq!(*first.borrow(), *second.borrow());
        assert_eq!(first.borrow().first(), Some(&Element::MessageStart));
        assert_eq!(first.borrow().last(), Some(&Element::MessageEnd));
    }
}
