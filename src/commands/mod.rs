//! Command tables and dispatch.
//!
//! A [`CommandTable`] binds multi-word command names to async handlers
//! over a strongly-typed context, so handlers receive exactly the
//! session/guild/message references they need instead of an untyped
//! argument bundle.

pub mod course;
pub mod guild;

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::error::Error;
use crate::Result;

type Handler<Ctx> = Box<dyn Fn(Ctx, Vec<String>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

struct Entry<Ctx> {
    words: Vec<String>,
    handler: Handler<Ctx>,
}

/// A set of commands bound to one context type.
pub struct CommandTable<Ctx> {
    entries: Vec<Entry<Ctx>>,
}

impl<Ctx> Default for CommandTable<Ctx>
where
    Ctx: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> CommandTable<Ctx>
where
    Ctx: Send + 'static,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a handler under a (possibly multi-word) command name.
    pub fn register<F, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(Ctx, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.entries.push(Entry {
            words: name.split_whitespace().map(str::to_string).collect(),
            handler: Box::new(move |ctx, args| Box::pin(handler(ctx, args))),
        });
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no commands.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dispatch a command line against the table.
    ///
    /// The longest name whose words prefix the input wins; the remaining
    /// words become the handler's arguments. No match yields
    /// [`Error::UnknownCommand`]; handler errors pass through unchanged
    /// for classification by the caller.
    pub async fn dispatch(&self, ctx: Ctx, line: &str) -> Result<()> {
        let words: Vec<&str> = line.split_whitespace().collect();

        let mut best: Option<&Entry<Ctx>> = None;
        for entry in &self.entries {
            let matches = entry.words.len() <= words.len()
                && entry
                    .words
                    .iter()
                    .zip(words.iter())
                    .all(|(word, input)| word.as_str() == *input);
            if matches && best.map_or(true, |b| entry.words.len() > b.words.len()) {
                best = Some(entry);
            }
        }

        match best {
            Some(entry) => {
                let args = words[entry.words.len()..]
                    .iter()
                    .map(|word| word.to_string())
                    .collect();
                (entry.handler)(ctx, args).await
            }
            None => Err(Error::UnknownCommand),
        }
    }
}
