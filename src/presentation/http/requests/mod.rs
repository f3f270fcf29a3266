use poem_openapi::Object;

#[derive(Object, Debug)]
pub struct CreateMessageRequestDto {
    pub phone_number: String,
    pub content: String,
}
