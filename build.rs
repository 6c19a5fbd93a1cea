fn main() {
    prost_build::compile_protos(&["proto/notes.proto"], &["proto"])
        .expect("failed to compile notes.proto");
}
