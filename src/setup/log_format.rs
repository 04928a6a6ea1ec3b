use std::fmt;
use std::io;

use slog::{Drain, Key, OwnedKVList, Record, KV};
use slog_term::{Decorator, RecordDecorator};

pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f %:z";

/// BenchFormat writes one line per record:
///
/// `[timestamp] [LEVEL] [client=3 replica=1] msg, id=5 err=...`
///
/// The bracket after the level holds the values of the logger, usually which simulated client
/// the record is about. It is left out for the root logger.
pub struct BenchFormat<D>
where
    D: Decorator,
{
    decorator: D,
}

impl<D> Drain for BenchFormat<D>
where
    D: Decorator,
{
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        let mut ctx = Pairs::default();
        values.serialize(record, &mut ctx)?;

        let mut fields = Pairs::default();
        record.kv().serialize(record, &mut fields)?;

        self.decorator.with_record(record, values, |rd| {
            rd.start_timestamp()?;
            write!(rd, "[{}]", chrono::Local::now().format(TIMESTAMP_FORMAT))?;
            rd.start_whitespace()?;
            write!(rd, " ")?;

            rd.start_level()?;
            write!(rd, "[{}]", record.level().as_short_str())?;
            rd.start_whitespace()?;
            write!(rd, " ")?;

            if !ctx.is_empty() {
                write!(rd, "[")?;
                ctx.write(rd)?;
                write!(rd, "]")?;
                rd.start_whitespace()?;
                write!(rd, " ")?;
            }

            rd.start_msg()?;
            write!(rd, "{}", record.msg())?;

            if !fields.is_empty() {
                rd.start_comma()?;
                write!(rd, ", ")?;
                fields.write(rd)?;
            }

            rd.start_whitespace()?;
            writeln!(rd)?;
            rd.flush()
        })
    }
}

impl<D> BenchFormat<D>
where
    D: Decorator,
{
    pub fn new(d: D) -> BenchFormat<D> {
        BenchFormat { decorator: d }
    }
}

/// Pairs collects key-values in the order they are written in a logging statement.
/// slog serializes them last first.
#[derive(Default)]
struct Pairs {
    kvs: Vec<(Key, String)>,
}

impl Pairs {
    fn is_empty(&self) -> bool {
        self.kvs.is_empty()
    }

    fn write(&self, rd: &mut dyn RecordDecorator) -> io::Result<()> {
        for (i, (k, v)) in self.kvs.iter().rev().enumerate() {
            if i > 0 {
                rd.start_whitespace()?;
                write!(rd, " ")?;
            }
            rd.start_key()?;
            write!(rd, "{}", k)?;
            rd.start_separator()?;
            write!(rd, "=")?;
            rd.start_value()?;
            write!(rd, "{}", v)?;
        }
        Ok(())
    }
}

impl slog::Serializer for Pairs {
    fn emit_arguments(&mut self, key: Key, val: &fmt::Arguments) -> slog::Result {
        self.kvs.push((key, format!("{}", val)));
        Ok(())
    }

    fn emit_none(&mut self, key: Key) -> slog::Result {
        self.kvs.push((key, "None".to_string()));
        Ok(())
    }
}
