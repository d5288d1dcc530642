fn main() {
    agrimarket_api::main();
}
