pub mod roll_call;
