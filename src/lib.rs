pub use {
    self::{
        homework::Homework,
        number::{ChildPosition, SnailfishNumber},
        util::{open_utf8_file, Args, Parse},
    },
    clap::Parser,
};

mod homework;
mod number;
mod util;
