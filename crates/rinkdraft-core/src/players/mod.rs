// Player data model: positions, player records, CSV tables and snapshots.

pub mod csv_io;
pub mod position;
pub mod record;
