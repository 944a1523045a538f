use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            extjson_fuzz::test(data);
        });
    }
}
