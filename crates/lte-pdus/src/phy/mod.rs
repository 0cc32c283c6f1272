pub mod prach;
