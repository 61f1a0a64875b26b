use rocket::request::FromParam;

use crate::models::PollId;
use crate::validation::ValidationError;

impl<'a> FromParam<'a> for PollId {
    type Error = ValidationError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}
