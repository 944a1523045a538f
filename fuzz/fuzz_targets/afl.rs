#[macro_use]
extern crate afl;

fn main() {
    fuzz!(|data: &[u8]| {
        extjson_fuzz::test(data);
    });
}
