pub mod discard;
