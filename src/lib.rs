// Mecanum drivetrain controller: wheel power mixing, field-centric driving,
// and encoder distance drive, plus a zenoh runtime around it

pub mod config;
pub mod drivetrain;
pub mod messages;
pub mod runtime;
