use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::{Reader, Writer};
use log::info;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use shared::Session;

use super::connection::CsvConnection;
use crate::storage::events::StoreEvent;
use crate::storage::traits::SessionStorage;

/// Separator for kid IDs inside the `kid_order` CSV column. UUIDs never
/// contain this character.
const ORDER_SEPARATOR: char = '|';

/// CSV-based session history repository: one append-only `sessions.csv`
/// file with a header row.
#[derive(Clone)]
pub struct SessionRepository {
    connection: CsvConnection,
}

impl SessionRepository {
    /// Create a new session repository
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Read the full session history from disk
    fn read_sessions(&self) -> Result<Vec<Session>> {
        let file_path = self.connection.sessions_file_path();
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)
            .with_context(|| format!("Failed to open {}", file_path.display()))?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut sessions = Vec::new();

        for result in csv_reader.records() {
            let record = result?;

            let kid_order_field = record.get(2).unwrap_or("");
            let kid_order: Vec<String> = if kid_order_field.is_empty() {
                Vec::new()
            } else {
                kid_order_field
                    .split(ORDER_SEPARATOR)
                    .map(|s| s.to_string())
                    .collect()
            };

            let lucky_by = record.get(4).unwrap_or("");

            sessions.push(Session {
                id: record.get(0).unwrap_or("").to_string(),
                timestamp: record.get(1).unwrap_or("").to_string(),
                kid_order,
                lucky_used: record.get(3).unwrap_or("false") == "true",
                lucky_by_kid_id: if lucky_by.is_empty() {
                    None
                } else {
                    Some(lucky_by.to_string())
                },
            });
        }

        // RFC 3339 timestamps sort lexicographically
        sessions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(sessions)
    }

    /// Write the full session history to disk atomically
    fn write_sessions(&self, sessions: &[Session]) -> Result<()> {
        let file_path = self.connection.sessions_file_path();
        let temp_path = file_path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;

            let writer = BufWriter::new(file);
            let mut csv_writer = Writer::from_writer(writer);

            csv_writer.write_record(&[
                "id",
                "timestamp",
                "kid_order",
                "lucky_used",
                "lucky_by_kid_id",
            ])?;

            for session in sessions {
                let kid_order = session
                    .kid_order
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(&ORDER_SEPARATOR.to_string());

                csv_writer.write_record(&[
                    session.id.as_str(),
                    session.timestamp.as_str(),
                    kid_order.as_str(),
                    if session.lucky_used { "true" } else { "false" },
                    session.lucky_by_kid_id.as_deref().unwrap_or(""),
                ])?;
            }

            csv_writer.flush()?;
        }

        std::fs::rename(&temp_path, &file_path)?;

        Ok(())
    }
}

#[async_trait]
impl SessionStorage for SessionRepository {
    async fn append_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.read_sessions()?;

        if sessions.iter().any(|s| s.id == session.id) {
            return Err(anyhow::anyhow!(
                "Session already exists: {}",
                session.id
            ));
        }

        sessions.push(session.clone());
        self.write_sessions(&sessions)?;

        info!(
            "Appended session {} with {} kids (lucky_used={})",
            session.id,
            session.kid_order.len(),
            session.lucky_used
        );
        self.connection.events().publish(StoreEvent::SessionsChanged);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.read_sessions()
    }

    async fn session_count(&self) -> Result<u32> {
        Ok(self.read_sessions()?.len() as u32)
    }
}
